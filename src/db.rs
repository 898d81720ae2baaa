use std::collections::HashMap;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AssessmentScore, HistoryRecord, IntakeRequest, IntakeWithUser, RosterEntry,
    ScheduledAppointment, UserRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        course: row.get("course"),
        department: row.get("department"),
        student_id: row.get("student_id"),
        year_level: row.get("year_level"),
        role: row.get("role"),
        contact_number: row.get("contact_number"),
        is_approved: row.get("is_approved"),
    }
}

pub async fn fetch_admin_account(
    pool: &PgPool,
    email: &str,
) -> anyhow::Result<Option<(String, Vec<String>)>> {
    let row = sqlx::query(
        "SELECT role, courses FROM counseling_office.admin_accounts \
         WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| (row.get("role"), row.get("courses"))))
}

pub async fn fetch_users(pool: &PgPool) -> anyhow::Result<Vec<UserRecord>> {
    let rows = sqlx::query(
        "SELECT id, first_name, last_name, email, course, department, student_id, \
         year_level, role, contact_number, is_approved \
         FROM counseling_office.users ORDER BY last_name, first_name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(user_from_row).collect())
}

pub async fn fetch_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserRecord>> {
    let row = sqlx::query(
        "SELECT id, first_name, last_name, email, course, department, student_id, \
         year_level, role, contact_number, is_approved \
         FROM counseling_office.users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Approval only ever sets the flag; rejection is a plain delete. The two
/// paths never touch each other's row state.
pub async fn approve_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    let result = sqlx::query(
        "UPDATE counseling_office.users SET is_approved = TRUE WHERE id = $1",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("no user found with id {user_id}");
    }
    log::info!("approved user {user_id}");
    Ok(())
}

pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM counseling_office.users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("no user found with id {user_id}");
    }
    log::info!("rejected and removed user {user_id}");
    Ok(())
}

/// Intakes joined to their user records. Intakes whose user was since
/// removed come back with `user: None` so the caller can report them.
pub async fn fetch_intakes_with_users(pool: &PgPool) -> anyhow::Result<Vec<IntakeWithUser>> {
    let rows = sqlx::query(
        "SELECT i.user_id, i.reason, i.created_at, \
         u.id, u.first_name, u.last_name, u.email, u.course, u.department, \
         u.student_id, u.year_level, u.role, u.contact_number, u.is_approved \
         FROM counseling_office.intake_requests i \
         LEFT JOIN counseling_office.users u ON u.id = i.user_id \
         ORDER BY i.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut intakes = Vec::new();
    for row in rows {
        let user = if row.get::<Option<Uuid>, _>("id").is_some() {
            Some(user_from_row(&row))
        } else {
            None
        };
        intakes.push(IntakeWithUser {
            intake: IntakeRequest {
                user_id: row.get("user_id"),
                reason: row.get("reason"),
                created_at: row.get("created_at"),
            },
            user,
        });
    }

    Ok(intakes)
}

pub async fn insert_scheduled(
    pool: &PgPool,
    appointment: &ScheduledAppointment,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO counseling_office.scheduled_appointments
        (id, user_id, scheduled_on, scheduled_at, message, response_status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(appointment.id)
    .bind(appointment.user_id)
    .bind(appointment.scheduled_on)
    .bind(appointment.scheduled_at)
    .bind(&appointment.message)
    .bind(&appointment.response_status)
    .execute(pool)
    .await?;

    log::info!(
        "scheduled appointment {} for user {} on {}",
        appointment.id,
        appointment.user_id,
        appointment.scheduled_on
    );
    Ok(())
}

fn scheduled_from_row(row: &PgRow) -> ScheduledAppointment {
    ScheduledAppointment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        scheduled_on: row.get("scheduled_on"),
        scheduled_at: row.get("scheduled_at"),
        message: row.get("message"),
        response_status: row.get("response_status"),
    }
}

pub async fn fetch_scheduled(
    pool: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<ScheduledAppointment>> {
    let rows = sqlx::query(
        "SELECT id, user_id, scheduled_on, scheduled_at, message, response_status \
         FROM counseling_office.scheduled_appointments WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(scheduled_from_row).collect())
}

pub async fn fetch_scheduled_by_id(
    pool: &PgPool,
    appointment_id: Uuid,
) -> anyhow::Result<Option<ScheduledAppointment>> {
    let row = sqlx::query(
        "SELECT id, user_id, scheduled_on, scheduled_at, message, response_status \
         FROM counseling_office.scheduled_appointments WHERE id = $1",
    )
    .bind(appointment_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(scheduled_from_row))
}

/// Close out a scheduled appointment in one transaction: append the history
/// record, delete the appointment, and delete the parent intake iff this was
/// the user's last scheduled appointment. Returns whether the intake went.
pub async fn finish_appointment(
    pool: &PgPool,
    history: &HistoryRecord,
    appointment_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await.context("failed to open transaction")?;

    sqlx::query(
        r#"
        INSERT INTO counseling_office.appointment_history
        (id, full_name, course, scheduled_on, scheduled_at, started_at, ended_at, remarks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(history.id)
    .bind(&history.full_name)
    .bind(&history.course)
    .bind(history.scheduled_on)
    .bind(history.scheduled_at)
    .bind(history.started_at)
    .bind(history.ended_at)
    .bind(&history.remarks)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query(
        "DELETE FROM counseling_office.scheduled_appointments WHERE id = $1",
    )
    .bind(appointment_id)
    .execute(&mut *tx)
    .await?;

    if deleted.rows_affected() != 1 {
        anyhow::bail!("scheduled appointment {appointment_id} no longer exists");
    }

    let remaining: i64 = sqlx::query(
        "SELECT COUNT(*) AS remaining \
         FROM counseling_office.scheduled_appointments WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?
    .get("remaining");

    let intake_deleted = if remaining == 0 {
        // Not every scheduled session traces back to an intake, so report
        // what the delete actually removed.
        let result =
            sqlx::query("DELETE FROM counseling_office.intake_requests WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        result.rows_affected() > 0
    } else {
        false
    };

    tx.commit().await.context("failed to commit finish")?;
    log::info!(
        "finished appointment {appointment_id} for user {user_id} \
         ({remaining} scheduled remaining, intake deleted: {intake_deleted})"
    );
    Ok(intake_deleted)
}

fn history_from_row(row: &PgRow) -> HistoryRecord {
    HistoryRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        course: row.get("course"),
        scheduled_on: row.get("scheduled_on"),
        scheduled_at: row.get("scheduled_at"),
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
        remarks: row.get("remarks"),
    }
}

pub async fn fetch_history(pool: &PgPool) -> anyhow::Result<Vec<HistoryRecord>> {
    let rows = sqlx::query(
        "SELECT id, full_name, course, scheduled_on, scheduled_at, started_at, \
         ended_at, remarks \
         FROM counseling_office.appointment_history ORDER BY ended_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(history_from_row).collect())
}

pub async fn fetch_sentiment_labels(pool: &PgPool) -> anyhow::Result<HashMap<Uuid, String>> {
    let rows = sqlx::query("SELECT user_id, label FROM counseling_office.sentiment_labels")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("user_id"), row.get("label")))
        .collect())
}

fn assessment_from_row(row: &PgRow) -> AssessmentScore {
    AssessmentScore {
        user_id: row.get("user_id"),
        score: row.get("score"),
        stress_level: row.get("stress_level"),
        notified: row.get("notified"),
    }
}

pub async fn fetch_assessment_scores(pool: &PgPool) -> anyhow::Result<Vec<AssessmentScore>> {
    let rows = sqlx::query(
        "SELECT user_id, score, stress_level, notified \
         FROM counseling_office.assessment_scores",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(assessment_from_row).collect())
}

pub async fn fetch_assessment(
    pool: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Option<AssessmentScore>> {
    let row = sqlx::query(
        "SELECT user_id, score, stress_level, notified \
         FROM counseling_office.assessment_scores WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(assessment_from_row))
}

pub async fn mark_notified(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE counseling_office.assessment_scores SET notified = TRUE WHERE user_id = $1",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_roster(pool: &PgPool, entries: &[RosterEntry]) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for entry in entries {
        let result = sqlx::query(
            r#"
            INSERT INTO counseling_office.roster_entries
            (id_number, name, course_year, school_year, semester)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id_number) DO UPDATE
            SET name = EXCLUDED.name, course_year = EXCLUDED.course_year,
                school_year = EXCLUDED.school_year, semester = EXCLUDED.semester
            "#,
        )
        .bind(&entry.id_number)
        .bind(&entry.name)
        .bind(&entry.course_year)
        .bind(&entry.school_year)
        .bind(&entry.semester)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }
    Ok(inserted)
}

pub async fn fetch_roster(pool: &PgPool) -> anyhow::Result<Vec<RosterEntry>> {
    let rows = sqlx::query(
        "SELECT id_number, name, course_year, school_year, semester \
         FROM counseling_office.roster_entries ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RosterEntry {
            name: row.get("name"),
            id_number: row.get("id_number"),
            course_year: row.get("course_year"),
            school_year: row.get("school_year"),
            semester: row.get("semester"),
        })
        .collect())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery",
            "Lee",
            "avery.lee@school.edu",
            "BSIT",
            "2021-00123",
            "3",
            true,
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules",
            "Moreno",
            "jules.moreno@school.edu",
            "BSCS",
            "2022-00456",
            "2",
            true,
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara",
            "Patel",
            "kiara.patel@school.edu",
            "BSIT",
            "2023-00789",
            "1",
            false,
        ),
    ];

    for (id, first, last, email, course, student_id, year, approved) in users {
        sqlx::query(
            r#"
            INSERT INTO counseling_office.users
            (id, first_name, last_name, email, course, student_id, year_level, role, is_approved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'student', $8)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name,
                course = EXCLUDED.course, is_approved = EXCLUDED.is_approved
            "#,
        )
        .bind(id)
        .bind(first)
        .bind(last)
        .bind(email)
        .bind(course)
        .bind(student_id)
        .bind(year)
        .bind(approved)
        .execute(pool)
        .await?;
    }

    let admins: Vec<(&str, &str, Vec<&str>)> = vec![
        (
            "counselor.reyes@school.edu",
            "subadmin",
            vec!["BSIT", "BSCS"],
        ),
        (crate::session::DEFAULT_SUPER_ADMIN_EMAIL, "admin", vec![]),
    ];

    for (email, role, courses) in admins {
        let courses: Vec<String> = courses.into_iter().map(str::to_string).collect();
        sqlx::query(
            r#"
            INSERT INTO counseling_office.admin_accounts (id, email, role, courses)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET role = EXCLUDED.role, courses = EXCLUDED.courses
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(role)
        .bind(&courses)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO counseling_office.intake_requests (user_id, reason, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?)
    .bind("Struggling to keep up with coursework and sleep")
    .bind(
        NaiveDate::from_ymd_opt(2026, 2, 2)
            .context("invalid date")?
            .and_hms_opt(9, 30, 0)
            .context("invalid time")?,
    )
    .execute(pool)
    .await?;

    let sentiments = vec![
        ("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2", "negative"),
        ("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc", "neutral"),
    ];
    for (id, label) in sentiments {
        sqlx::query(
            r#"
            INSERT INTO counseling_office.sentiment_labels (user_id, label)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET label = EXCLUDED.label
            "#,
        )
        .bind(Uuid::parse_str(id)?)
        .bind(label)
        .execute(pool)
        .await?;
    }

    let assessments = vec![
        ("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2", 47.5, "Severe"),
        ("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc", 22.0, "Medium"),
    ];
    for (id, score, level) in assessments {
        sqlx::query(
            r#"
            INSERT INTO counseling_office.assessment_scores (user_id, score, stress_level)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET score = EXCLUDED.score, stress_level = EXCLUDED.stress_level
            "#,
        )
        .bind(Uuid::parse_str(id)?)
        .bind(score)
        .bind(level)
        .execute(pool)
        .await?;
    }

    Ok(())
}
