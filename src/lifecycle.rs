use anyhow::bail;
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use uuid::Uuid;

use crate::models::{AssessmentScore, HistoryRecord, ScheduledAppointment, UserRecord};

/// Status a newly scheduled appointment starts in. Later status values are
/// written by the student-facing app, never by this tool.
pub const STATUS_PENDING: &str = "Pending";

const UNASSIGNED_COURSE: &str = "Unassigned";

/// Remarks must carry content before any write happens.
pub fn validate_remarks(remarks: &str) -> anyhow::Result<String> {
    let trimmed = remarks.trim();
    if trimmed.is_empty() {
        bail!("remarks cannot be empty");
    }
    Ok(trimmed.to_string())
}

pub fn validate_message(message: &str) -> anyhow::Result<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        bail!("appointment message cannot be empty");
    }
    Ok(trimmed.to_string())
}

/// Appointments are only set during office hours, Mon-Fri 08:00-17:00.
pub fn within_business_hours(at: NaiveDateTime) -> bool {
    let weekday = at.weekday();
    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        return false;
    }
    (8..17).contains(&at.hour())
}

/// Build the terminal history record for a finished appointment. Name and
/// course are denormalized from the user so the history row outlives both
/// the appointment and the user record.
pub fn history_record(
    user: &UserRecord,
    appointment: &ScheduledAppointment,
    remarks: &str,
    ended_at: NaiveDateTime,
) -> HistoryRecord {
    HistoryRecord {
        id: Uuid::new_v4(),
        full_name: user.full_name(),
        course: user
            .course_or_department()
            .unwrap_or(UNASSIGNED_COURSE)
            .to_string(),
        scheduled_on: appointment.scheduled_on,
        scheduled_at: appointment.scheduled_at,
        started_at: appointment.scheduled_on.and_time(appointment.scheduled_at),
        ended_at,
        remarks: remarks.to_string(),
    }
}

/// Newest first, by scheduled date then time.
pub fn sort_newest_first(appointments: &mut [ScheduledAppointment]) {
    appointments.sort_by(|a, b| {
        (b.scheduled_on, b.scheduled_at).cmp(&(a.scheduled_on, a.scheduled_at))
    });
}

/// Outcome of the severe-stress notification check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Stress level is Severe: flag the record and alert the counselor.
    Escalate,
    /// Any other level: report it, write nothing.
    NoAction { stress_level: String },
}

pub fn notify_outcome(assessment: &AssessmentScore) -> NotifyOutcome {
    if assessment.stress_level.trim().eq_ignore_ascii_case("severe") {
        NotifyOutcome::Escalate
    } else {
        NotifyOutcome::NoAction {
            stress_level: assessment.stress_level.to_lowercase(),
        }
    }
}

/// Star rating shown next to an average assessment score: one filled star
/// per ten points, capped at five.
pub fn star_rating(score: f64) -> usize {
    ((score / 10.0).floor().max(0.0) as usize).min(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn user_with_course(course: Option<&str>) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            first_name: "Jules".to_string(),
            last_name: "Moreno".to_string(),
            email: "jules.moreno@example.edu".to_string(),
            course: course.map(str::to_string),
            department: None,
            student_id: "2022-00456".to_string(),
            year_level: "2".to_string(),
            role: "student".to_string(),
            contact_number: None,
            is_approved: true,
        }
    }

    fn appointment() -> ScheduledAppointment {
        ScheduledAppointment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            scheduled_on: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            scheduled_at: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            message: "Initial session".to_string(),
            response_status: STATUS_PENDING.to_string(),
        }
    }

    #[test]
    fn rejects_empty_and_whitespace_remarks() {
        assert!(validate_remarks("").is_err());
        assert!(validate_remarks("   \n\t").is_err());
        assert_eq!(validate_remarks("  went well  ").unwrap(), "went well");
    }

    #[test]
    fn business_hours_cover_weekdays_eight_to_five() {
        // 2026-03-04 is a Wednesday.
        let wednesday = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        assert!(within_business_hours(
            wednesday.and_hms_opt(8, 0, 0).unwrap()
        ));
        assert!(within_business_hours(
            wednesday.and_hms_opt(16, 59, 59).unwrap()
        ));
        assert!(!within_business_hours(
            wednesday.and_hms_opt(17, 0, 0).unwrap()
        ));
        assert!(!within_business_hours(
            wednesday.and_hms_opt(7, 59, 0).unwrap()
        ));

        let saturday = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert!(!within_business_hours(
            saturday.and_hms_opt(10, 0, 0).unwrap()
        ));
    }

    #[test]
    fn history_record_denormalizes_name_and_course() {
        let user = user_with_course(Some("BSIT"));
        let appointment = appointment();
        let ended = NaiveDate::from_ymd_opt(2026, 3, 4)
            .unwrap()
            .and_hms_opt(11, 15, 0)
            .unwrap();

        let record = history_record(&user, &appointment, "productive session", ended);
        assert_eq!(record.full_name, "Jules Moreno");
        assert_eq!(record.course, "BSIT");
        assert_eq!(record.scheduled_on, appointment.scheduled_on);
        assert_eq!(
            record.started_at,
            appointment.scheduled_on.and_time(appointment.scheduled_at)
        );
        assert_eq!(record.ended_at, ended);
    }

    #[test]
    fn history_record_without_course_is_marked_unassigned() {
        let user = user_with_course(None);
        let record = history_record(
            &user,
            &appointment(),
            "ok",
            NaiveDate::from_ymd_opt(2026, 3, 4)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap(),
        );
        assert_eq!(record.course, "Unassigned");
    }

    #[test]
    fn appointments_sort_newest_first() {
        let mut appointments = vec![appointment(), appointment(), appointment()];
        appointments[0].scheduled_on = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        appointments[1].scheduled_on = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        appointments[1].scheduled_at = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        appointments[2].scheduled_on = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        appointments[2].scheduled_at = NaiveTime::from_hms_opt(14, 0, 0).unwrap();

        sort_newest_first(&mut appointments);
        assert_eq!(
            appointments[0].scheduled_at,
            NaiveTime::from_hms_opt(14, 0, 0).unwrap()
        );
        assert_eq!(
            appointments[2].scheduled_on,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }

    #[test]
    fn only_severe_stress_escalates() {
        let mut assessment = AssessmentScore {
            user_id: Uuid::new_v4(),
            score: 42.0,
            stress_level: "SEVERE".to_string(),
            notified: false,
        };
        assert_eq!(notify_outcome(&assessment), NotifyOutcome::Escalate);

        assessment.stress_level = "Medium".to_string();
        assert_eq!(
            notify_outcome(&assessment),
            NotifyOutcome::NoAction {
                stress_level: "medium".to_string()
            }
        );
    }

    #[test]
    fn star_rating_fills_one_star_per_ten_points() {
        assert_eq!(star_rating(0.0), 0);
        assert_eq!(star_rating(9.9), 0);
        assert_eq!(star_rating(10.0), 1);
        assert_eq!(star_rating(34.0), 3);
        assert_eq!(star_rating(50.0), 5);
        assert_eq!(star_rating(73.0), 5);
        assert_eq!(star_rating(-5.0), 0);
    }
}
