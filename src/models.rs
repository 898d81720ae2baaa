use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

/// A registered student or employee from the `users` collection.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: Option<String>,
    pub department: Option<String>,
    pub student_id: String,
    pub year_level: String,
    pub role: String,
    pub contact_number: Option<String>,
    pub is_approved: bool,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Course with a fallback to department for employee accounts. Blank
    /// values count as absent.
    pub fn course_or_department(&self) -> Option<&str> {
        self.course
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                self.department
                    .as_deref()
                    .filter(|value| !value.trim().is_empty())
            })
    }
}

/// Resolved admin identity for one command invocation. Built once in main
/// and passed down by reference; there is no global current-user state.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub email: String,
    pub role: String,
    pub course_scope: Vec<String>,
    pub is_super_admin: bool,
}

impl AdminSession {
    /// Subadmins see only their assigned courses; every other admin role,
    /// and the super-admin sentinel, sees the full set.
    pub fn is_scoped(&self) -> bool {
        !self.is_super_admin && self.role == "subadmin"
    }
}

/// Stress/counseling intake request, keyed 1:1 to the user that raised it.
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub user_id: Uuid,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

/// Intake joined to its user record. The user side can be missing when the
/// registration was rejected after the intake was created.
#[derive(Debug, Clone)]
pub struct IntakeWithUser {
    pub intake: IntakeRequest,
    pub user: Option<UserRecord>,
}

#[derive(Debug, Clone)]
pub struct ScheduledAppointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scheduled_on: NaiveDate,
    pub scheduled_at: NaiveTime,
    pub message: String,
    pub response_status: String,
}

/// Append-only record of a completed counseling session. Name and course are
/// denormalized so the row survives deletion of the user.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub full_name: String,
    pub course: String,
    pub scheduled_on: NaiveDate,
    pub scheduled_at: NaiveTime,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub remarks: String,
}

/// Psychological assessment result produced by the external analysis
/// pipeline; this tool only reads it and flips the notified flag.
#[derive(Debug, Clone)]
pub struct AssessmentScore {
    pub user_id: Uuid,
    pub score: f64,
    pub stress_level: String,
    pub notified: bool,
}

/// One row of the student monitoring table: user joined with the external
/// sentiment label and assessment score, either of which can be absent.
#[derive(Debug, Clone)]
pub struct StudentRow {
    pub user: UserRecord,
    pub sentiment: Option<String>,
    pub assessment: Option<AssessmentScore>,
}

/// Roster entry imported from the registrar's CSV or JSON export.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RosterEntry {
    pub name: String,
    #[serde(alias = "idNumber")]
    pub id_number: String,
    #[serde(alias = "courseYear")]
    pub course_year: String,
    #[serde(alias = "schoolYear")]
    pub school_year: String,
    pub semester: String,
}
