use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{
    CollectionSelector, CommitRequest, CommitResponse, DELIVERED_AT_FIELD, Document, DocumentMask,
    FieldTransform, Filter, Precondition, RunQueryRequest, RunQueryResponseItem, STATUS_FIELD,
    StructuredQuery, UPDATED_AT_FIELD, Value, Write,
};
use crate::order::Order;
use crate::store::{BatchUpdate, CommitResult, OrderQuery, OrderStore, StoreError};

pub const API_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE: &str = "(default)";

/// Firestore REST client scoped to a single collection.
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    database: String,
    collection: String,
    access_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(project_id: String, collection: String) -> Result<Self, StoreError> {
        Self::with_base_url(project_id, collection, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (emulator or tests).
    pub fn with_base_url(
        project_id: String,
        collection: String,
        base_url: String,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            database: DEFAULT_DATABASE.to_string(),
            collection,
            access_token: None,
        })
    }

    pub fn with_database(mut self, database: String) -> Self {
        self.database = database;
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_access_token(mut self, token: String) -> Self {
        self.access_token = Some(token);
        self
    }

    fn database_path(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/{}:{method}", self.base_url, self.database_path())
    }

    fn document_name(&self, id: &str) -> String {
        format!("{}/{}/{id}", self.database_path(), self.collection)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn build_query(&self, query: &OrderQuery) -> RunQueryRequest {
        let status = Filter::field(
            STATUS_FIELD,
            "EQUAL",
            Value::StringValue(query.status.as_str().to_string()),
        );
        let filter = match query.delivered_before {
            None => status,
            Some(cutoff) => Filter::and(vec![
                status,
                Filter::field(
                    DELIVERED_AT_FIELD,
                    "LESS_THAN",
                    Value::TimestampValue(format_timestamp(cutoff)),
                ),
            ]),
        };

        RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: self.collection.clone(),
                }],
                filter: Some(filter),
            },
        }
    }

    fn build_commit(&self, batch: &BatchUpdate) -> CommitRequest {
        let writes = batch
            .updates()
            .iter()
            .map(|u| Write {
                update: Document {
                    name: self.document_name(&u.order_id),
                    fields: [(
                        STATUS_FIELD.to_string(),
                        Value::StringValue(u.status.as_str().to_string()),
                    )]
                    .into_iter()
                    .collect(),
                    create_time: None,
                    update_time: None,
                },
                update_mask: DocumentMask {
                    field_paths: vec![STATUS_FIELD.to_string()],
                },
                update_transforms: vec![FieldTransform {
                    field_path: UPDATED_AT_FIELD.to_string(),
                    set_to_server_value: "REQUEST_TIME",
                }],
                current_document: Precondition { exists: true },
            })
            .collect();
        CommitRequest { writes }
    }
}

impl OrderStore for FirestoreClient {
    async fn query(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        let body = self.build_query(query);
        let response = self
            .authorize(self.client.post(self.endpoint("runQuery")))
            .json(&body)
            .send()
            .await?;

        let items: Vec<RunQueryResponseItem> = decode(response).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.document)
            .map(Document::into_order)
            .collect())
    }

    async fn commit(&self, batch: &BatchUpdate) -> Result<CommitResult, StoreError> {
        let body = self.build_commit(batch);
        let response = self
            .authorize(self.client.post(self.endpoint("commit")))
            .json(&body)
            .send()
            .await?;

        let committed: CommitResponse = decode(response).await?;
        let commit_time = DateTime::parse_from_rfc3339(&committed.commit_time)
            .map_err(|e| StoreError::Decode(format!("invalid commitTime: {e}")))?
            .with_timezone(&Utc);

        Ok(CommitResult {
            commit_time,
            writes: committed.write_results.len(),
        })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Map the HTTP status to a [`StoreError`] or decode the JSON body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = error_message(&text);
        return Err(match status {
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => StoreError::Conflict(message),
            StatusCode::SERVICE_UNAVAILABLE => StoreError::Unavailable(message),
            _ => StoreError::Api {
                status: status.as_u16(),
                message,
            },
        });
    }

    serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Pull `error.message` out of a Google API error body, or return it raw.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
