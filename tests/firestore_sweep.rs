use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use order_sweeper::config::SweeperConfig;
use order_sweeper::store::InMemoryStore;
use order_sweeper::sweeper::{self, SweepOutcome};

const QUERY_PATH: &str = "/v1/projects/gogama/databases/(default)/documents:runQuery";
const COMMIT_PATH: &str = "/v1/projects/gogama/databases/(default)/documents:commit";

fn config(server: &MockServer) -> SweeperConfig {
    SweeperConfig {
        project_id: "gogama".into(),
        base_url: server.uri(),
        ..Default::default()
    }
}

fn doc(id: &str, fields: serde_json::Value) -> serde_json::Value {
    json!({
        "document": {
            "name": format!("projects/gogama/databases/(default)/documents/orders/{id}"),
            "fields": fields,
        },
        "readTime": "2026-10-16T00:00:00Z"
    })
}

#[tokio::test]
async fn sweep_against_firestore_ships_only_old_deliveries() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doc("A", json!({
                "status": {"stringValue": "Delivered"},
                "deliveredAt": {"timestampValue": "2026-10-11T00:00:00Z"}
            })),
            doc("B", json!({
                "status": {"stringValue": "Delivered"},
                "deliveredAt": {"timestampValue": "2026-10-15T00:00:00Z"}
            })),
            doc("D", json!({"status": {"stringValue": "Delivered"}})),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(COMMIT_PATH))
        .and(body_partial_json(json!({
            "writes": [{
                "update": {"name": "projects/gogama/databases/(default)/documents/orders/A"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "writeResults": [{"updateTime": "2026-10-16T00:00:01Z"}],
            "commitTime": "2026-10-16T00:00:01Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = config(&server).firestore_client().unwrap();
    let report = sweeper::run(now, &store).await.unwrap();

    assert_eq!(report.outcome, SweepOutcome::Shipped);
    assert_eq!(report.shipped, ["A"]);
    assert_eq!(report.processed(), 1);
    assert_eq!(report.fetched, 3);
    assert_eq!(
        report.commit_time,
        Some(Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 1).unwrap())
    );
}

#[tokio::test]
async fn no_eligible_orders_means_no_commit_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doc("D", json!({"status": {"stringValue": "Delivered"}})),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COMMIT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = config(&server).firestore_client().unwrap();
    let report = sweeper::run(Utc::now(), &store).await.unwrap();

    assert_eq!(report.outcome, SweepOutcome::NoneEligible);
    assert_eq!(report.processed(), 0);
}

#[tokio::test]
async fn rejected_commit_fails_the_run() {
    let server = MockServer::start().await;
    let delivered = (Utc::now() - Duration::days(10)).to_rfc3339();

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doc("A", json!({
                "status": {"stringValue": "Delivered"},
                "deliveredAt": {"timestampValue": delivered}
            })),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COMMIT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": 500, "message": "internal", "status": "INTERNAL"}
        })))
        .mount(&server)
        .await;

    let store = config(&server).firestore_client().unwrap();
    let err = sweeper::run(Utc::now(), &store).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Order store error: store API error (status 500): internal"
    );
}

#[tokio::test]
async fn demo_seed_file_sweeps_in_memory() {
    let seed = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/orders.json");
    let store = InMemoryStore::from_json_file(&seed).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();

    let report = sweeper::run(now, &store).await.unwrap();

    assert_eq!(report.shipped, ["A"]);
    assert_eq!(report.fetched, 4);
    assert_eq!(report.skipped.len(), 3);
}
