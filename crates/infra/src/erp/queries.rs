//! Typed ERP queries
//!
//! Route-facing methods are fail-soft: list queries return an empty vector and
//! detail queries return `None` on any failure (the client has already logged
//! it). The sync path uses [`ErpQueries::fetch_modified_since`], which reports
//! failures.

use std::sync::Arc;

use async_trait::async_trait;
use campusbridge_core::RemoteRecordSource;
use campusbridge_domain::{
    format_erp_timestamp, CampusBridgeError, EntityType, FilterOp, QueryFilter, Record,
    Result as DomainResult,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, instrument};

use super::client::ErpClient;
use super::errors::ApiError;
use super::query::ListQuery;

const DATE_FORMAT: &str = "%Y-%m-%d";

mod fields {
    pub const STUDENT: &[&str] = &[
        "name",
        "student_name",
        "student_email_id",
        "student_batch_name",
        "date_of_birth",
        "gender",
        "student_mobile_number",
        "modified",
    ];
    pub const STUDENT_SEARCH: &[&str] =
        &["name", "student_name", "student_email_id", "student_batch_name"];
    pub const PROGRAM_ENROLLMENT: &[&str] = &[
        "name",
        "program",
        "academic_year",
        "academic_term",
        "enrollment_date",
        "student_batch_name",
    ];
    pub const ASSESSMENT_RESULT: &[&str] = &[
        "name",
        "assessment_plan",
        "result",
        "grade",
        "total_score",
        "maximum_score",
        "creation",
    ];
    pub const STUDENT_ATTENDANCE: &[&str] =
        &["name", "attendance_date", "status", "course_schedule", "student_group"];
    pub const INSTRUCTOR: &[&str] =
        &["name", "instructor_name", "email", "mobile_no", "department", "employee"];
    pub const INSTRUCTOR_SCHEDULE: &[&str] =
        &["name", "course", "student_group", "schedule_date", "from_time", "to_time", "room"];
    pub const COURSE: &[&str] =
        &["name", "course_name", "course_code", "department", "course_intro", "is_published"];
    pub const COURSE_SCHEDULE: &[&str] = &[
        "name",
        "course",
        "instructor",
        "student_group",
        "schedule_date",
        "from_time",
        "to_time",
        "room",
        "color",
    ];
    pub const STUDENT_GROUP: &[&str] =
        &["name", "group_name", "batch", "academic_year", "academic_term", "max_strength"];
    pub const ASSESSMENT_PLAN: &[&str] = &[
        "name",
        "assessment_name",
        "course",
        "maximum_assessment_score",
        "assessment_criteria",
        "grading_scale",
    ];
    pub const ACADEMIC_YEAR: &[&str] =
        &["name", "academic_year_name", "year_start_date", "year_end_date"];
    pub const ACADEMIC_TERM: &[&str] =
        &["name", "academic_year", "term_name", "term_start_date", "term_end_date"];
}

/// Optional constraints for [`ErpQueries::course_schedules`].
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub student_group: Option<String>,
    pub instructor: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// Query layer over the ERP client.
#[derive(Clone)]
pub struct ErpQueries {
    client: Arc<ErpClient>,
}

impl ErpQueries {
    pub fn new(client: Arc<ErpClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ErpClient> {
        &self.client
    }

    // Students

    /// Students, optionally only those modified at or after `modified_since`.
    pub async fn students(
        &self,
        limit: Option<usize>,
        modified_since: Option<NaiveDateTime>,
    ) -> Vec<Record> {
        let filter = QueryFilter::new().with_opt(
            "modified",
            FilterOp::Gte,
            modified_since.as_ref().map(format_erp_timestamp),
        );
        let query = ListQuery::new("Student")
            .fields(fields::STUDENT)
            .filter(filter)
            .limit(limit.unwrap_or(50));
        or_empty(self.list(query).await)
    }

    pub async fn student(&self, id: &str) -> Option<Record> {
        or_none(self.detail("Student", id).await)
    }

    /// Substring search over student name and email.
    pub async fn search_students(&self, term: &str, limit: Option<usize>) -> Vec<Record> {
        let query = ListQuery::new("Student")
            .fields(fields::STUDENT_SEARCH)
            .filter(QueryFilter::search(&["student_name", "student_email_id"], term))
            .limit(limit.unwrap_or(10));
        or_empty(self.list(query).await)
    }

    pub async fn student_enrollments(&self, student: &str) -> Vec<Record> {
        let query = ListQuery::new("Program Enrollment")
            .fields(fields::PROGRAM_ENROLLMENT)
            .filter(QueryFilter::new().with("student", FilterOp::Eq, student))
            .limit(50);
        or_empty(self.list(query).await)
    }

    /// Most recent assessment results first.
    pub async fn student_assessments(&self, student: &str, limit: Option<usize>) -> Vec<Record> {
        let query = ListQuery::new("Assessment Result")
            .fields(fields::ASSESSMENT_RESULT)
            .filter(QueryFilter::new().with("student", FilterOp::Eq, student))
            .limit(limit.unwrap_or(20))
            .order_by("creation desc");
        or_empty(self.list(query).await)
    }

    pub async fn student_attendance(
        &self,
        student: &str,
        from_date: Option<NaiveDate>,
    ) -> Vec<Record> {
        let filter = QueryFilter::new().with("student", FilterOp::Eq, student).with_opt(
            "attendance_date",
            FilterOp::Gte,
            from_date.map(|d| d.format(DATE_FORMAT).to_string()),
        );
        let query = ListQuery::new("Student Attendance")
            .fields(fields::STUDENT_ATTENDANCE)
            .filter(filter)
            .limit(100)
            .order_by("attendance_date desc");
        or_empty(self.list(query).await)
    }

    /// Guardians embedded in the student's detail record.
    pub async fn student_guardians(&self, student: &str) -> Vec<Record> {
        self.student(student).await.map(|s| child_rows(&s, "guardians")).unwrap_or_default()
    }

    pub async fn guardian(&self, id: &str) -> Option<Record> {
        or_none(self.detail("Guardian", id).await)
    }

    // Instructors

    pub async fn instructors(&self, limit: Option<usize>) -> Vec<Record> {
        let query =
            ListQuery::new("Instructor").fields(fields::INSTRUCTOR).limit(limit.unwrap_or(50));
        or_empty(self.list(query).await)
    }

    pub async fn instructor(&self, id: &str) -> Option<Record> {
        or_none(self.detail("Instructor", id).await)
    }

    /// Course schedules taught by an instructor.
    pub async fn instructor_schedules(&self, instructor: &str) -> Vec<Record> {
        let query = ListQuery::new("Course Schedule")
            .fields(fields::INSTRUCTOR_SCHEDULE)
            .filter(QueryFilter::new().with("instructor", FilterOp::Eq, instructor))
            .limit(100);
        or_empty(self.list(query).await)
    }

    // Courses and schedules

    pub async fn courses(&self, limit: Option<usize>) -> Vec<Record> {
        let query = ListQuery::new("Course").fields(fields::COURSE).limit(limit.unwrap_or(100));
        or_empty(self.list(query).await)
    }

    pub async fn course(&self, id: &str) -> Option<Record> {
        or_none(self.detail("Course", id).await)
    }

    pub async fn course_schedules(&self, filter: &ScheduleFilter) -> Vec<Record> {
        let conditions = QueryFilter::new()
            .with_opt("student_group", FilterOp::Eq, filter.student_group.clone())
            .with_opt("instructor", FilterOp::Eq, filter.instructor.clone())
            .with_opt(
                "schedule_date",
                FilterOp::Gte,
                filter.from_date.map(|d| d.format(DATE_FORMAT).to_string()),
            )
            .with_opt(
                "schedule_date",
                FilterOp::Lte,
                filter.to_date.map(|d| d.format(DATE_FORMAT).to_string()),
            );
        let query = ListQuery::new("Course Schedule")
            .fields(fields::COURSE_SCHEDULE)
            .filter(conditions)
            .limit(200);
        or_empty(self.list(query).await)
    }

    // Groups and assessment plans

    pub async fn student_groups(&self, academic_year: Option<&str>) -> Vec<Record> {
        let query = ListQuery::new("Student Group")
            .fields(fields::STUDENT_GROUP)
            .filter(QueryFilter::new().with_opt("academic_year", FilterOp::Eq, academic_year))
            .limit(100);
        or_empty(self.list(query).await)
    }

    /// Members embedded in the student group's detail record.
    pub async fn student_group_members(&self, group: &str) -> Vec<Record> {
        or_none(self.detail("Student Group", group).await)
            .map(|g| child_rows(&g, "students"))
            .unwrap_or_default()
    }

    pub async fn assessment_plans(
        &self,
        course: Option<&str>,
        academic_year: Option<&str>,
    ) -> Vec<Record> {
        let filter = QueryFilter::new()
            .with_opt("course", FilterOp::Eq, course)
            .with_opt("academic_year", FilterOp::Eq, academic_year);
        let query = ListQuery::new("Assessment Plan")
            .fields(fields::ASSESSMENT_PLAN)
            .filter(filter)
            .limit(100);
        or_empty(self.list(query).await)
    }

    // Academic calendar

    pub async fn academic_years(&self) -> Vec<Record> {
        let query = ListQuery::new("Academic Year").fields(fields::ACADEMIC_YEAR).limit(20);
        or_empty(self.list(query).await)
    }

    pub async fn academic_terms(&self, academic_year: Option<&str>) -> Vec<Record> {
        let query = ListQuery::new("Academic Term")
            .fields(fields::ACADEMIC_TERM)
            .filter(QueryFilter::new().with_opt("academic_year", FilterOp::Eq, academic_year))
            .limit(50);
        or_empty(self.list(query).await)
    }

    // Sync path

    /// Records of `entity` modified at or after `since`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates every [`ApiError`] so callers can tell a failed query from
    /// an empty result.
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn fetch_modified_since(
        &self,
        entity: EntityType,
        since: Option<NaiveDateTime>,
        limit: usize,
    ) -> Result<Vec<Record>, ApiError> {
        let filter = QueryFilter::new().with_opt(
            "modified",
            FilterOp::Gte,
            since.as_ref().map(format_erp_timestamp),
        );
        let query = ListQuery::new(entity.doctype())
            .fields(entity.sync_fields())
            .filter(filter)
            .limit(limit)
            .order_by("modified desc");

        let records = self.list(query).await?;
        debug!(count = records.len(), "fetched modified records");
        Ok(records)
    }

    async fn list(&self, query: ListQuery) -> Result<Vec<Record>, ApiError> {
        let params = query.to_params();
        let value = self.client.get(&["api", "resource", query.doctype()], &params).await?;
        unwrap_list(value)
    }

    /// `Ok(None)` for an unknown identifier.
    async fn detail(&self, doctype: &str, id: &str) -> Result<Option<Record>, ApiError> {
        if id.trim().is_empty() {
            return Ok(None);
        }
        match self.client.get(&["api", "resource", doctype, id], &[]).await {
            Ok(value) => unwrap_detail(value).map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl RemoteRecordSource for ErpQueries {
    async fn fetch_modified_since(
        &self,
        entity: EntityType,
        since: Option<NaiveDateTime>,
        limit: usize,
    ) -> DomainResult<Vec<Record>> {
        Self::fetch_modified_since(self, entity, since, limit).await.map_err(CampusBridgeError::from)
    }
}

fn unwrap_list(value: Value) -> Result<Vec<Record>, ApiError> {
    match take_data(value)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| Record::try_from(item).map_err(|e| ApiError::Decode(e.to_string())))
            .collect(),
        other => Err(ApiError::Decode(format!("expected a list under \"data\", got {other}"))),
    }
}

fn unwrap_detail(value: Value) -> Result<Record, ApiError> {
    Record::try_from(take_data(value)?).map_err(|e| ApiError::Decode(e.to_string()))
}

fn take_data(value: Value) -> Result<Value, ApiError> {
    match value {
        Value::Object(mut envelope) => envelope
            .remove("data")
            .ok_or_else(|| ApiError::Decode("response has no \"data\" field".into())),
        _ => Err(ApiError::Decode("response is not a JSON object".into())),
    }
}

/// Child table rows (e.g. `guardians`) embedded in a detail record.
fn child_rows(parent: &Record, field: &str) -> Vec<Record> {
    match parent.get(field) {
        Some(Value::Array(rows)) => {
            rows.iter().filter_map(|row| Record::try_from(row.clone()).ok()).collect()
        }
        _ => Vec::new(),
    }
}

fn or_empty(result: Result<Vec<Record>, ApiError>) -> Vec<Record> {
    result.unwrap_or_default()
}

fn or_none(result: Result<Option<Record>, ApiError>) -> Option<Record> {
    result.ok().flatten()
}
