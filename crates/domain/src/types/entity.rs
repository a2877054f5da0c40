//! The closed set of ERP entity types mirrored by the local cache.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CampusBridgeError;

/// Entity types synchronised from the ERP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Student,
    Instructor,
    Course,
    CourseSchedule,
    AssessmentResult,
    StudentAttendance,
    StudentGroup,
    Guardian,
    AcademicYear,
    AcademicTerm,
}

impl EntityType {
    /// Every entity type, in sync order.
    pub const ALL: [Self; 10] = [
        Self::Student,
        Self::Instructor,
        Self::Course,
        Self::CourseSchedule,
        Self::AssessmentResult,
        Self::StudentAttendance,
        Self::StudentGroup,
        Self::Guardian,
        Self::AcademicYear,
        Self::AcademicTerm,
    ];

    /// ERPNext doctype addressed under `/api/resource/<doctype>`.
    pub const fn doctype(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Instructor => "Instructor",
            Self::Course => "Course",
            Self::CourseSchedule => "Course Schedule",
            Self::AssessmentResult => "Assessment Result",
            Self::StudentAttendance => "Student Attendance",
            Self::StudentGroup => "Student Group",
            Self::Guardian => "Guardian",
            Self::AcademicYear => "Academic Year",
            Self::AcademicTerm => "Academic Term",
        }
    }

    /// Key used for persistence and logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Course => "course",
            Self::CourseSchedule => "course_schedule",
            Self::AssessmentResult => "assessment_result",
            Self::StudentAttendance => "student_attendance",
            Self::StudentGroup => "student_group",
            Self::Guardian => "guardian",
            Self::AcademicYear => "academic_year",
            Self::AcademicTerm => "academic_term",
        }
    }

    /// Fixed field projection requested when syncing this entity.
    ///
    /// Always contains `name` and `modified`.
    pub const fn sync_fields(self) -> &'static [&'static str] {
        match self {
            Self::Student => &[
                "name",
                "student_name",
                "student_email_id",
                "student_batch_name",
                "date_of_birth",
                "gender",
                "student_mobile_number",
                "modified",
            ],
            Self::Instructor => &[
                "name",
                "instructor_name",
                "email",
                "mobile_no",
                "department",
                "employee",
                "modified",
            ],
            Self::Course => &[
                "name",
                "course_name",
                "course_code",
                "department",
                "course_intro",
                "is_published",
                "modified",
            ],
            Self::CourseSchedule => &[
                "name",
                "course",
                "instructor",
                "student_group",
                "schedule_date",
                "from_time",
                "to_time",
                "room",
                "color",
                "modified",
            ],
            Self::AssessmentResult => &[
                "name",
                "student",
                "assessment_plan",
                "result",
                "grade",
                "total_score",
                "maximum_score",
                "creation",
                "modified",
            ],
            Self::StudentAttendance => &[
                "name",
                "student",
                "attendance_date",
                "status",
                "course_schedule",
                "student_group",
                "modified",
            ],
            Self::StudentGroup => &[
                "name",
                "group_name",
                "batch",
                "academic_year",
                "academic_term",
                "max_strength",
                "modified",
            ],
            Self::Guardian => &[
                "name",
                "guardian_name",
                "email_address",
                "mobile_number",
                "occupation",
                "modified",
            ],
            Self::AcademicYear => {
                &["name", "academic_year_name", "year_start_date", "year_end_date", "modified"]
            }
            Self::AcademicTerm => &[
                "name",
                "academic_year",
                "term_name",
                "term_start_date",
                "term_end_date",
                "modified",
            ],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CampusBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| CampusBridgeError::InvalidInput(format!("unknown entity type: {s}")))
    }
}
