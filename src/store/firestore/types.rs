//! Wire types for the Firestore REST v1 `runQuery` and `commit` endpoints.
//!
//! Only the parts of the API the sweeper touches are modelled. Unknown fields
//! in responses are ignored by serde.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::order::{DeliveredAt, Order, OrderStatus};

pub const STATUS_FIELD: &str = "status";
pub const DELIVERED_AT_FIELD: &str = "deliveredAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// A typed Firestore field value, e.g. `{"stringValue": "Delivered"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// 64-bit integers travel as decimal strings.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(serde_json::Value),
    MapValue(serde_json::Value),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::NullValue(_) => "null",
            Value::BooleanValue(_) => "boolean",
            Value::IntegerValue(_) => "integer",
            Value::DoubleValue(_) => "double",
            Value::TimestampValue(_) => "timestamp",
            Value::StringValue(_) => "string",
            Value::BytesValue(_) => "bytes",
            Value::ReferenceValue(_) => "reference",
            Value::GeoPointValue(_) => "geoPoint",
            Value::ArrayValue(_) => "array",
            Value::MapValue(_) => "map",
        }
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{collection}/{id}`.
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// The document id, i.e. the last segment of its resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Convert to an [`Order`].
    ///
    /// `deliveredAt` only counts when it is a timestamp value; any other type
    /// is kept as [`DeliveredAt::Malformed`]. Null is treated as absent.
    pub fn into_order(self) -> Order {
        let status = match self.fields.get(STATUS_FIELD) {
            Some(Value::StringValue(s)) => OrderStatus::from(s.as_str()),
            _ => OrderStatus::Other(String::new()),
        };

        let delivered_at = match self.fields.get(DELIVERED_AT_FIELD) {
            None | Some(Value::NullValue(_)) => None,
            Some(Value::TimestampValue(raw)) => Some(DeliveredAt::parse(raw)),
            Some(other) => Some(DeliveredAt::Malformed(format!(
                "{} value",
                other.type_name()
            ))),
        };

        let updated_at = match self.fields.get(UPDATED_AT_FIELD) {
            Some(Value::TimestampValue(raw)) => DeliveredAt::parse(raw).resolve(),
            _ => None,
        };

        Order {
            id: self.id().to_string(),
            status,
            delivered_at,
            updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    FieldFilter(FieldFilter),
    CompositeFilter(CompositeFilter),
}

impl Filter {
    pub fn field(path: &str, op: &'static str, value: Value) -> Self {
        Filter::FieldFilter(FieldFilter {
            field: FieldReference {
                field_path: path.to_string(),
            },
            op,
            value,
        })
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::CompositeFilter(CompositeFilter { op: "AND", filters })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositeFilter {
    pub op: &'static str,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

/// One element of the streamed `runQuery` response array. Elements without a
/// document only carry progress information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponseItem {
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub read_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    pub update: Document,
    pub update_mask: DocumentMask,
    pub update_transforms: Vec<FieldTransform>,
    pub current_document: Precondition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Precondition {
    pub exists: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub write_results: Vec<serde_json::Value>,
    pub commit_time: String,
}
