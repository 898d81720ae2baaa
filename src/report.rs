use std::collections::HashMap;
use std::fmt::Write;

use uuid::Uuid;

use crate::lifecycle;
use crate::models::{
    AssessmentScore, HistoryRecord, IntakeWithUser, RosterEntry, ScheduledAppointment,
    StudentRow, UserRecord,
};

/// Stress levels in display order for the dashboard distribution.
pub const STRESS_LEVELS: [&str; 5] = ["Low", "Medium", "High", "Very High", "Severe"];

const NO_SENTIMENT: &str = "No sentiment data";
const NO_ASSESSMENT: &str = "No average status";
const NO_REASON: &str = "No reason for stress provided";

/// A rendered screen: title, column headers, string rows. Markdown and PDF
/// output are both produced from this shape.
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    fn new(title: &str, headers: &[&str]) -> Self {
        ReportTable {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Join users to their external sentiment labels and assessment scores.
pub fn join_student_rows(
    users: Vec<UserRecord>,
    sentiments: &HashMap<Uuid, String>,
    assessments: &[AssessmentScore],
) -> Vec<StudentRow> {
    let by_user: HashMap<Uuid, &AssessmentScore> = assessments
        .iter()
        .map(|assessment| (assessment.user_id, assessment))
        .collect();

    users
        .into_iter()
        .map(|user| StudentRow {
            sentiment: sentiments.get(&user.id).cloned(),
            assessment: by_user.get(&user.id).map(|a| (*a).clone()),
            user,
        })
        .collect()
}

/// Count assessment records per stress level, fixed bucket order. Unknown
/// levels are dropped, matching the dashboard chart.
pub fn stress_distribution(assessments: &[AssessmentScore]) -> Vec<(&'static str, usize)> {
    STRESS_LEVELS
        .iter()
        .map(|level| {
            let count = assessments
                .iter()
                .filter(|a| a.stress_level.trim().eq_ignore_ascii_case(level))
                .count();
            (*level, count)
        })
        .collect()
}

/// Approved-user counts per course, with a per-role breakdown.
pub fn approved_counts(users: &[UserRecord]) -> Vec<(String, usize, Vec<(String, usize)>)> {
    let mut map: HashMap<String, HashMap<String, usize>> = HashMap::new();

    for user in users.iter().filter(|u| u.is_approved) {
        let Some(course) = user.course_or_department() else {
            continue;
        };
        *map.entry(course.to_string())
            .or_default()
            .entry(user.role.clone())
            .or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize, Vec<(String, usize)>)> = map
        .into_iter()
        .map(|(course, roles)| {
            let total = roles.values().sum();
            let mut roles: Vec<(String, usize)> = roles.into_iter().collect();
            roles.sort_by(|a, b| a.0.cmp(&b.0));
            (course, total, roles)
        })
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn stars(score: f64) -> String {
    let filled = lifecycle::star_rating(score);
    format!("{}{}", "*".repeat(filled), "-".repeat(5 - filled))
}

pub fn approvals_table(users: &[&UserRecord]) -> ReportTable {
    let mut table = ReportTable::new(
        "User Approval",
        &[
            "Student/Employee",
            "Course/Department",
            "Student ID",
            "Year Level",
            "Email",
        ],
    );
    for user in users.iter().filter(|u| !u.is_approved) {
        table.rows.push(vec![
            user.full_name(),
            user.course_or_department().unwrap_or("").to_string(),
            user.student_id.clone(),
            user.year_level.clone(),
            user.email.clone(),
        ]);
    }
    table
}

/// Approved users only; pending registrations belong to the approval queue.
pub fn students_table(rows: &[StudentRow]) -> ReportTable {
    let mut table = ReportTable::new(
        "Students",
        &["Name", "ID", "Course", "Status", "Ave Status"],
    );
    for row in rows.iter().filter(|row| row.user.is_approved) {
        table.rows.push(vec![
            row.user.full_name(),
            row.user.student_id.clone(),
            row.user.course_or_department().unwrap_or("").to_string(),
            row.sentiment
                .clone()
                .unwrap_or_else(|| "No Status".to_string()),
            row.assessment
                .as_ref()
                .map(|a| format!("{} ({:.0})", stars(a.score), a.score))
                .unwrap_or_else(|| NO_ASSESSMENT.to_string()),
        ]);
    }
    table
}

pub fn monitoring_table(rows: &[StudentRow]) -> ReportTable {
    let mut table = ReportTable::new(
        "Student / Employee Monitoring",
        &[
            "Name",
            "Student ID",
            "Course",
            "Sentiment Analysis",
            "Psychological Assessment",
        ],
    );
    for row in rows {
        table.rows.push(vec![
            row.user.full_name(),
            row.user.student_id.clone(),
            row.user.course_or_department().unwrap_or("").to_string(),
            row.sentiment
                .clone()
                .unwrap_or_else(|| NO_SENTIMENT.to_string()),
            row.assessment
                .as_ref()
                .map(|a| format!("{} ({:.0})", stars(a.score), a.score))
                .unwrap_or_else(|| NO_ASSESSMENT.to_string()),
        ]);
    }
    table
}

pub fn appointments_table(intakes: &[&IntakeWithUser]) -> ReportTable {
    let mut table = ReportTable::new(
        "Appointment Requests",
        &["Name", "Email", "Course", "Reason", "Requested"],
    );
    for entry in intakes {
        let Some(user) = &entry.user else { continue };
        let reason = if entry.intake.reason.trim().is_empty() {
            NO_REASON.to_string()
        } else {
            entry.intake.reason.clone()
        };
        table.rows.push(vec![
            user.full_name(),
            user.email.clone(),
            user.course_or_department().unwrap_or("").to_string(),
            reason,
            entry.intake.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

pub fn scheduled_table(appointments: &[ScheduledAppointment]) -> ReportTable {
    let mut table = ReportTable::new(
        "Scheduled Appointments",
        &["Date", "Time", "Message", "Status"],
    );
    for appointment in appointments {
        table.rows.push(vec![
            appointment.scheduled_on.to_string(),
            appointment.scheduled_at.format("%H:%M").to_string(),
            appointment.message.clone(),
            appointment.response_status.clone(),
        ]);
    }
    table
}

pub fn history_table(records: &[HistoryRecord]) -> ReportTable {
    let mut table = ReportTable::new(
        "Appointment History",
        &[
            "Name",
            "Course",
            "Start of Counseling",
            "End of Counseling",
            "Remarks",
        ],
    );
    for record in records {
        table.rows.push(vec![
            record.full_name.clone(),
            record.course.clone(),
            record.started_at.format("%Y-%m-%d %H:%M").to_string(),
            record.ended_at.format("%Y-%m-%d %H:%M").to_string(),
            record.remarks.clone(),
        ]);
    }
    table
}

/// Completed sessions rolled up per denormalized course, busiest first.
pub fn history_course_counts(records: &[HistoryRecord]) -> Vec<(String, usize)> {
    let mut map: HashMap<String, usize> = HashMap::new();
    for record in records {
        *map.entry(record.course.clone()).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = map.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// History table plus the per-course session rollup.
pub fn build_history_report(records: &[HistoryRecord]) -> String {
    let mut output = render_markdown(&history_table(records));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sessions by Course");

    let counts = history_course_counts(records);
    if counts.is_empty() {
        let _ = writeln!(output, "No completed sessions.");
    } else {
        for (course, count) in counts {
            let _ = writeln!(output, "- {}: {} sessions", course, count);
        }
    }
    output
}

pub fn roster_table(entries: &[&RosterEntry]) -> ReportTable {
    let mut table = ReportTable::new(
        "Student List",
        &["Name", "ID Number", "Course/Year", "School Year", "Semester"],
    );
    for entry in entries {
        table.rows.push(vec![
            entry.name.clone(),
            entry.id_number.clone(),
            entry.course_year.clone(),
            entry.school_year.clone(),
            entry.semester.clone(),
        ]);
    }
    table
}

pub fn dashboard_table(assessments: &[AssessmentScore]) -> ReportTable {
    let mut table = ReportTable::new(
        "Psychological Assessment",
        &["Level of Stress", "Number of Users"],
    );
    for (level, count) in stress_distribution(assessments) {
        table.rows.push(vec![level.to_string(), count.to_string()]);
    }
    table
}

pub fn render_markdown(table: &ReportTable) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", table.title);
    let _ = writeln!(output);

    if table.rows.is_empty() {
        let _ = writeln!(output, "No records found.");
        return output;
    }

    let _ = writeln!(output, "| {} |", table.headers.join(" | "));
    let _ = writeln!(
        output,
        "|{}|",
        table
            .headers
            .iter()
            .map(|_| " --- ")
            .collect::<Vec<_>>()
            .join("|")
    );
    for row in &table.rows {
        let _ = writeln!(output, "| {} |", row.join(" | "));
    }
    output
}

/// The dashboard combines the stress distribution with approved-user counts
/// per course and role.
pub fn build_dashboard_report(
    assessments: &[AssessmentScore],
    users: &[UserRecord],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Counseling Office Dashboard");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Psychological Assessment");

    let distribution = stress_distribution(assessments);
    if distribution.iter().all(|(_, count)| *count == 0) {
        let _ = writeln!(output, "No assessment records.");
    } else {
        for (level, count) in distribution {
            let _ = writeln!(output, "- {}: {} users", level, count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Approved Users by Course");

    let counts = approved_counts(users);
    if counts.is_empty() {
        let _ = writeln!(output, "No approved users.");
    } else {
        for (course, total, roles) in counts {
            let breakdown = roles
                .iter()
                .map(|(role, count)| format!("{} {}", count, role))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(output, "- {}: {} ({})", course, total, breakdown);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user(course: &str, approved: bool, role: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            first_name: "Kiara".to_string(),
            last_name: "Patel".to_string(),
            email: "kiara.patel@example.edu".to_string(),
            course: Some(course.to_string()),
            department: None,
            student_id: "2023-00789".to_string(),
            year_level: "1".to_string(),
            role: role.to_string(),
            contact_number: None,
            is_approved: approved,
        }
    }

    fn assessment(user_id: Uuid, score: f64, level: &str) -> AssessmentScore {
        AssessmentScore {
            user_id,
            score,
            stress_level: level.to_string(),
            notified: false,
        }
    }

    #[test]
    fn join_attaches_sentiment_and_assessment_by_user() {
        let users = vec![user("BSIT", true, "student"), user("BSCS", true, "student")];
        let first_id = users[0].id;
        let mut sentiments = HashMap::new();
        sentiments.insert(first_id, "negative".to_string());
        let assessments = vec![assessment(first_id, 35.0, "High")];

        let rows = join_student_rows(users, &sentiments, &assessments);
        assert_eq!(rows[0].sentiment.as_deref(), Some("negative"));
        assert_eq!(rows[0].assessment.as_ref().unwrap().score, 35.0);
        assert!(rows[1].sentiment.is_none());
        assert!(rows[1].assessment.is_none());
    }

    #[test]
    fn distribution_buckets_are_case_insensitive_and_ordered() {
        let assessments = vec![
            assessment(Uuid::new_v4(), 10.0, "low"),
            assessment(Uuid::new_v4(), 20.0, "LOW"),
            assessment(Uuid::new_v4(), 45.0, "Severe"),
            assessment(Uuid::new_v4(), 40.0, "very high"),
            assessment(Uuid::new_v4(), 0.0, "unknown"),
        ];
        let distribution = stress_distribution(&assessments);
        assert_eq!(
            distribution,
            vec![
                ("Low", 2),
                ("Medium", 0),
                ("High", 0),
                ("Very High", 1),
                ("Severe", 1),
            ]
        );
    }

    #[test]
    fn approved_counts_skip_pending_users() {
        let users = vec![
            user("BSIT", true, "student"),
            user("BSIT", true, "employee"),
            user("BSIT", false, "student"),
            user("BSCS", true, "student"),
        ];
        let counts = approved_counts(&users);
        assert_eq!(counts[0].0, "BSIT");
        assert_eq!(counts[0].1, 2);
        assert_eq!(
            counts[1],
            ("BSCS".to_string(), 1, vec![("student".to_string(), 1)])
        );
    }

    #[test]
    fn students_table_lists_only_approved_users() {
        let users = vec![user("BSIT", true, "student"), user("BSCS", false, "student")];
        let sentiments = HashMap::new();
        let rows = join_student_rows(users, &sentiments, &[]);

        let table = students_table(&rows);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][2], "BSIT");
    }

    #[test]
    fn approvals_table_lists_only_pending_users() {
        let approved = user("BSIT", true, "student");
        let pending = user("BSCS", false, "student");
        let users = vec![&approved, &pending];
        let table = approvals_table(&users);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "BSCS");
    }

    #[test]
    fn appointments_table_skips_unmatched_intakes() {
        let matched = IntakeWithUser {
            intake: crate::models::IntakeRequest {
                user_id: Uuid::new_v4(),
                reason: "  ".to_string(),
                created_at: NaiveDate::from_ymd_opt(2026, 2, 2)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
            },
            user: Some(user("BSIT", true, "student")),
        };
        let unmatched = IntakeWithUser {
            user: None,
            ..matched.clone()
        };

        let intakes = vec![&matched, &unmatched];
        let table = appointments_table(&intakes);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][3], NO_REASON);
    }

    #[test]
    fn markdown_renders_headers_rows_and_empty_notice() {
        let mut table = ReportTable::new("Student List", &["Name", "ID Number"]);
        assert!(render_markdown(&table).contains("No records found."));

        table
            .rows
            .push(vec!["Avery Lee".to_string(), "2021-00123".to_string()]);
        let markdown = render_markdown(&table);
        assert!(markdown.contains("# Student List"));
        assert!(markdown.contains("| Name | ID Number |"));
        assert!(markdown.contains("| Avery Lee | 2021-00123 |"));
    }

    #[test]
    fn history_report_counts_sessions_per_course() {
        let record = |course: &str| HistoryRecord {
            id: Uuid::new_v4(),
            full_name: "Avery Lee".to_string(),
            course: course.to_string(),
            scheduled_on: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            scheduled_at: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            started_at: NaiveDate::from_ymd_opt(2026, 3, 4)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            ended_at: NaiveDate::from_ymd_opt(2026, 3, 4)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap(),
            remarks: "ok".to_string(),
        };

        let records = vec![record("BSIT"), record("BSIT"), record("BSCS")];
        assert_eq!(
            history_course_counts(&records),
            vec![("BSIT".to_string(), 2), ("BSCS".to_string(), 1)]
        );

        let report = build_history_report(&records);
        assert!(report.contains("## Sessions by Course"));
        assert!(report.contains("- BSIT: 2 sessions"));

        let empty = build_history_report(&[]);
        assert!(empty.contains("No completed sessions."));
    }

    #[test]
    fn dashboard_report_names_both_sections() {
        let users = vec![user("BSIT", true, "student")];
        let assessments = vec![assessment(users[0].id, 47.0, "Severe")];
        let report = build_dashboard_report(&assessments, &users);
        assert!(report.contains("## Psychological Assessment"));
        assert!(report.contains("- Severe: 1 users"));
        assert!(report.contains("- BSIT: 1 (1 student)"));
    }
}
