//! Query layer behaviour against a mock ERP.

mod support;

use std::sync::Arc;

use campusbridge_infra::erp::{ErpClient, ErpQueries, ScheduleFilter};
use chrono::NaiveDate;
use serde_json::json;
use support::{erp_config, list_body, student};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn queries(server: &MockServer) -> ErpQueries {
    let client = ErpClient::new(&erp_config(&server.uri())).expect("client builds");
    ErpQueries::new(Arc::new(client))
}

#[tokio::test]
async fn search_matches_name_or_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .and(query_param(
            "filters",
            r#"["or",["student_name","like","%ana%"],["student_email_id","like","%ana%"]]"#,
        ))
        .and(query_param("limit_page_length", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![student(
            "EDU-STU-1",
            "Ana",
            "2024-03-01 08:00:00",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let results = queries(&server).await.search_students("ana", None).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), Some("EDU-STU-1"));
}

#[tokio::test]
async fn list_failures_degrade_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Instructor"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(queries(&server).await.instructors(None).await.is_empty());
}

#[tokio::test]
async fn unknown_detail_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Course/NOPE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"exc_type": "DoesNotExistError"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Course/MATH-101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"name": "MATH-101", "course_name": "Calculus"}
        })))
        .mount(&server)
        .await;

    let queries = queries(&server).await;

    assert!(queries.course("NOPE").await.is_none());
    let course = queries.course("MATH-101").await.expect("course found");
    assert_eq!(course.get_str("course_name"), Some("Calculus"));
}

#[tokio::test]
async fn guardians_come_from_the_student_child_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Student/EDU-STU-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "name": "EDU-STU-1",
                "guardians": [
                    {"guardian": "GRD-1", "guardian_name": "Maria", "relation": "Mother"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let guardians = queries(&server).await.student_guardians("EDU-STU-1").await;

    assert_eq!(guardians.len(), 1);
    assert_eq!(guardians[0].get_str("guardian"), Some("GRD-1"));
}

#[tokio::test]
async fn schedules_filter_by_date_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Course%20Schedule"))
        .and(query_param(
            "filters",
            r#"[["student_group","=","G1"],["schedule_date",">=","2024-06-01"],["schedule_date","<=","2024-06-30"]]"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(vec![json!({
            "name": "CS-0001",
            "schedule_date": "2024-06-03"
        })])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = ScheduleFilter {
        student_group: Some("G1".into()),
        instructor: None,
        from_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        to_date: NaiveDate::from_ymd_opt(2024, 6, 30),
    };
    let schedules = queries(&server).await.course_schedules(&filter).await;

    assert_eq!(schedules.len(), 1);
}
