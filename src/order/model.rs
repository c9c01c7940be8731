use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of an order as stored in the `status` field.
///
/// Only `Delivered` and `Shipped` matter to the sweeper; every other value is
/// carried through untouched as [`OrderStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Delivered,
    Shipped,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Other(s) => s,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "Delivered" => OrderStatus::Delivered,
            "Shipped" => OrderStatus::Shipped,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Delivered" => OrderStatus::Delivered,
            "Shipped" => OrderStatus::Shipped,
            _ => OrderStatus::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value found in an order's `deliveredAt` field.
///
/// Stores hand back whatever was written by the delivery process, so a value
/// that is present but not a usable timestamp is kept as `Malformed` rather
/// than rejected while decoding. Both variants serialize as a bare string.
/// Deserializing never fails: strings are parsed with [`DeliveredAt::parse`]
/// and any other JSON type becomes `Malformed("<type> value")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DeliveredAt {
    Timestamp(DateTime<Utc>),
    Malformed(String),
}

impl DeliveredAt {
    /// Parses an RFC 3339 timestamp, falling back to `Malformed`.
    pub fn parse(raw: &str) -> Self {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => DeliveredAt::Timestamp(ts.with_timezone(&Utc)),
            Err(_) => DeliveredAt::Malformed(raw.to_string()),
        }
    }

    /// The resolved timestamp, if there is one.
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            DeliveredAt::Timestamp(ts) => Some(*ts),
            DeliveredAt::Malformed(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for DeliveredAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DeliveredAtVisitor)
    }
}

struct DeliveredAtVisitor;

impl DeliveredAtVisitor {
    fn malformed<E>(kind: &str) -> Result<DeliveredAt, E> {
        Ok(DeliveredAt::Malformed(format!("{kind} value")))
    }
}

impl<'de> Visitor<'de> for DeliveredAtVisitor {
    type Value = DeliveredAt;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a deliveredAt value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<DeliveredAt, E> {
        Ok(DeliveredAt::parse(v))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<DeliveredAt, E> {
        Self::malformed("boolean")
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<DeliveredAt, E> {
        Self::malformed("integer")
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<DeliveredAt, E> {
        Self::malformed("integer")
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<DeliveredAt, E> {
        Self::malformed("double")
    }

    fn visit_unit<E: de::Error>(self) -> Result<DeliveredAt, E> {
        Self::malformed("null")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DeliveredAt, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Self::malformed("array")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<DeliveredAt, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Self::malformed("map")
    }
}

impl From<DateTime<Utc>> for DeliveredAt {
    fn from(ts: DateTime<Utc>) -> Self {
        DeliveredAt::Timestamp(ts)
    }
}

/// An order record as read from the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DeliveredAt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(id: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            id: id.into(),
            status,
            delivered_at: None,
            updated_at: None,
        }
    }

    /// Builder-style helper for setting `deliveredAt`.
    pub fn delivered_at(mut self, value: impl Into<DeliveredAt>) -> Self {
        self.delivered_at = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_from_known_and_unknown_strings() {
        assert_eq!(OrderStatus::from("Delivered"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from("Shipped"), OrderStatus::Shipped);
        assert_eq!(
            OrderStatus::from("Pending"),
            OrderStatus::Other("Pending".into())
        );
        // Matching is case-sensitive, like the stored field.
        assert_eq!(
            OrderStatus::from("delivered"),
            OrderStatus::Other("delivered".into())
        );
    }

    #[test]
    fn status_display_round_trips_other_values() {
        assert_eq!(OrderStatus::Shipped.to_string(), "Shipped");
        assert_eq!(OrderStatus::Other("Cancelled".into()).to_string(), "Cancelled");
    }

    #[test]
    fn delivered_at_parses_rfc3339() {
        let parsed = DeliveredAt::parse("2026-10-10T08:30:00Z");
        let expected = Utc.with_ymd_and_hms(2026, 10, 10, 8, 30, 0).unwrap();
        assert_eq!(parsed, DeliveredAt::Timestamp(expected));
        assert_eq!(parsed.resolve(), Some(expected));
    }

    #[test]
    fn delivered_at_keeps_garbage_as_malformed() {
        let parsed = DeliveredAt::parse("last tuesday");
        assert_eq!(parsed, DeliveredAt::Malformed("last tuesday".into()));
        assert_eq!(parsed.resolve(), None);
    }

    #[test]
    fn order_json_uses_store_field_names() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let order = Order::new("A", OrderStatus::Delivered).delivered_at(ts);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "Delivered");
        assert_eq!(json["deliveredAt"], "2026-10-01T00:00:00Z");
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn order_json_tolerates_unparseable_delivered_at() {
        let order: Order =
            serde_json::from_str(r#"{"id":"E","status":"Delivered","deliveredAt":"soon"}"#)
                .unwrap();
        assert_eq!(order.delivered_at, Some(DeliveredAt::Malformed("soon".into())));
    }

    #[test]
    fn non_string_delivered_at_is_malformed_not_an_error() {
        let cases = [
            ("1700000000", "integer value"),
            ("-5", "integer value"),
            ("1.5", "double value"),
            ("true", "boolean value"),
            (r#"[1, "x"]"#, "array value"),
            (r#"{"seconds": 1700000000}"#, "map value"),
        ];
        for (raw, expected) in cases {
            let json = format!(r#"{{"id":"N","status":"Delivered","deliveredAt":{raw}}}"#);
            let order: Order = serde_json::from_str(&json).unwrap();
            assert_eq!(
                order.delivered_at,
                Some(DeliveredAt::Malformed(expected.into())),
                "deliveredAt = {raw}"
            );
        }
    }

    #[test]
    fn null_delivered_at_is_missing() {
        let order: Order =
            serde_json::from_str(r#"{"id":"D","status":"Delivered","deliveredAt":null}"#).unwrap();
        assert!(order.delivered_at.is_none());
    }

    #[test]
    fn order_without_delivered_at_deserializes() {
        let order: Order = serde_json::from_str(r#"{"id":"D","status":"Delivered"}"#).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.delivered_at.is_none());
    }
}
