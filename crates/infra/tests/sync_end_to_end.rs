//! End-to-end sync against a mock ERP and a real SQLite cache.

mod support;

use std::sync::Arc;

use campusbridge_core::{RecordCache, SyncService, SyncSettings};
use campusbridge_domain::{parse_erp_timestamp, EntityType, SyncOutcomeStatus};
use campusbridge_infra::erp::{ErpClient, ErpQueries};
use serde_json::json;
use support::{erp_config, list_body, student, TestDatabase};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    db: TestDatabase,
    service: SyncService,
}

async fn harness(entities: Vec<EntityType>) -> Harness {
    let server = MockServer::start().await;
    let db = TestDatabase::new();

    let client = ErpClient::new(&erp_config(&server.uri())).expect("client builds");
    let queries = ErpQueries::new(Arc::new(client));
    let service = SyncService::new(
        Arc::new(queries),
        Arc::new(db.cache()),
        SyncSettings { page_size: 100, entities },
    );

    Harness { server, db, service }
}

#[tokio::test]
async fn first_sync_fills_cache_and_sets_watermark() {
    let h = harness(vec![EntityType::Student]).await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .and(query_param("limit_page_length", "100"))
        .and(query_param("order_by", "modified desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![
            student("EDU-STU-2", "Bruno", "2024-03-02 09:30:00.000000"),
            student("EDU-STU-1", "Ana", "2024-03-01 08:00:00.000000"),
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = h.service.sync_all().await;

    let outcome = report.outcome(EntityType::Student).expect("student outcome");
    assert_eq!(outcome.status, SyncOutcomeStatus::Advanced);
    assert_eq!(outcome.merged, 2);

    let cache = h.db.cache();
    assert_eq!(cache.count_records(EntityType::Student).await.unwrap(), 2);
    let watermark = cache.get_watermark(EntityType::Student).await.unwrap().expect("watermark");
    assert_eq!(watermark.last_modified, parse_erp_timestamp("2024-03-02 09:30:00").unwrap());

    let ana = cache.get_record(EntityType::Student, "EDU-STU-1").await.unwrap().expect("cached");
    assert_eq!(ana.get_str("student_name"), Some("Ana"));
}

#[tokio::test]
async fn follow_up_sync_asks_only_for_changes_since_watermark() {
    let h = harness(vec![EntityType::Student]).await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![student(
            "EDU-STU-1",
            "Ana",
            "2024-03-01 08:00:00.000000",
        )])))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;

    h.service.sync_all().await;

    // The boundary record comes back again next to a genuinely new change.
    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .and(query_param("filters", r#"[["modified",">=","2024-03-01 08:00:00.000000"]]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![
            student("EDU-STU-1", "Ana Maria", "2024-03-05 12:00:00.000000"),
            student("EDU-STU-3", "Carla", "2024-03-01 08:00:00.000000"),
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = h.service.sync_all().await;

    let outcome = report.outcome(EntityType::Student).expect("student outcome");
    assert_eq!(outcome.status, SyncOutcomeStatus::Advanced);
    assert_eq!(outcome.merged, 2);
    assert_eq!(outcome.watermark, parse_erp_timestamp("2024-03-05 12:00:00"));

    let cache = h.db.cache();
    let ids: Vec<String> = cache
        .list_records(EntityType::Student)
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.id().map(str::to_string))
        .collect();
    assert_eq!(ids, vec!["EDU-STU-1", "EDU-STU-3"]);

    let ana = cache.get_record(EntityType::Student, "EDU-STU-1").await.unwrap().expect("cached");
    assert_eq!(ana.get_str("student_name"), Some("Ana Maria"));
}

#[tokio::test]
async fn redelivered_page_changes_nothing() {
    let h = harness(vec![EntityType::Student]).await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![student(
            "EDU-STU-1",
            "Ana",
            "2024-03-01 08:00:00.000000",
        )])))
        .mount(&h.server)
        .await;

    let first = h.service.sync_all().await;
    let second = h.service.sync_all().await;

    let first = first.outcome(EntityType::Student).expect("outcome");
    let second = second.outcome(EntityType::Student).expect("outcome");
    assert_eq!(first.merged, 1);
    assert_eq!(second.merged, 0);
    assert_eq!(first.watermark, second.watermark);
    assert_eq!(h.db.cache().count_records(EntityType::Student).await.unwrap(), 1);
}

#[tokio::test]
async fn failing_entity_does_not_block_the_others() {
    let h = harness(vec![EntityType::Student, EntityType::Course]).await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Course"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![json!({
            "name": "MATH-101",
            "course_name": "Calculus",
            "modified": "2024-02-10 10:00:00.000000",
        })])))
        .mount(&h.server)
        .await;

    let report = h.service.sync_all().await;

    let students = report.outcome(EntityType::Student).expect("student outcome");
    assert!(students.is_failure());
    assert_eq!(students.watermark, None);

    let courses = report.outcome(EntityType::Course).expect("course outcome");
    assert_eq!(courses.status, SyncOutcomeStatus::Advanced);

    let cache = h.db.cache();
    assert!(cache.get_watermark(EntityType::Student).await.unwrap().is_none());
    assert!(cache.get_watermark(EntityType::Course).await.unwrap().is_some());
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.advanced_count(), 1);
}

#[tokio::test]
async fn empty_remote_page_is_unchanged_not_failed() {
    let h = harness(vec![EntityType::Instructor]).await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Instructor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(Vec::new())))
        .mount(&h.server)
        .await;

    let report = h.service.sync_all().await;

    let outcome = report.outcome(EntityType::Instructor).expect("outcome");
    assert_eq!(outcome.status, SyncOutcomeStatus::Unchanged);
    assert!(report.is_fully_successful());
}
