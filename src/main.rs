use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

mod db;
mod filter;
mod lifecycle;
mod models;
mod pdf;
mod report;
mod roster;
mod session;

use models::AdminSession;

#[derive(Parser)]
#[command(name = "counseling-office-admin")]
#[command(about = "Counseling office administration console", long_about = None)]
struct Cli {
    /// Acting admin email; required by every command that reads student data
    #[arg(long, global = true)]
    admin: Option<String>,
    /// Narrow a listing to a single course
    #[arg(long, global = true)]
    course: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Registration approval queue
    Approvals {
        #[command(subcommand)]
        command: ApprovalsCommand,
    },
    /// Student list with sentiment labels and assessment scores
    Students {
        #[command(subcommand)]
        command: StudentsCommand,
    },
    /// Full monitoring table across all users
    Monitor {
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Intake requests and scheduled counseling sessions
    Appointments {
        #[command(subcommand)]
        command: AppointmentsCommand,
    },
    /// Completed-session history
    History {
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Stress-level distribution and approved-user counts
    Dashboard {
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Imported student roster
    Roster {
        #[command(subcommand)]
        command: RosterCommand,
    },
}

#[derive(Subcommand)]
enum ApprovalsCommand {
    /// Users awaiting approval, within the admin's course scope
    List {
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Approve a registration; sets the flag, never deletes
    Approve {
        #[arg(long)]
        user: Uuid,
    },
    /// Reject a registration; removes the record, never sets the flag
    Reject {
        #[arg(long)]
        user: Uuid,
    },
}

#[derive(Subcommand)]
enum StudentsCommand {
    List {
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Flag a student whose assessed stress level is Severe
    Notify {
        #[arg(long)]
        user: Uuid,
    },
}

#[derive(Subcommand)]
enum AppointmentsCommand {
    /// Intake requests joined to their user records, within scope
    List,
    /// Create a scheduled appointment (status starts Pending)
    Schedule {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        #[arg(long)]
        message: String,
        /// Skip the business-hours check
        #[arg(long)]
        force: bool,
    },
    /// A user's scheduled appointments, newest first
    Scheduled {
        #[arg(long)]
        user: Uuid,
    },
    /// Close out a session: append history, remove the appointment, and
    /// remove the intake when nothing is left scheduled
    Finish {
        #[arg(long)]
        appointment: Uuid,
        #[arg(long)]
        remarks: String,
    },
}

#[derive(Subcommand)]
enum RosterCommand {
    /// Import roster entries from a registrar export
    #[command(group(
        ArgGroup::new("source")
            .args(["csv", "json"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: Option<PathBuf>,
    },
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|err| format!("invalid time '{value}': {err}"))
}

async fn require_session(pool: &PgPool, admin: Option<&str>) -> anyhow::Result<AdminSession> {
    let email = admin.context("--admin <email> is required for this command")?;
    session::resolve(pool, email).await
}

fn emit_table(table: &report::ReportTable, pdf_path: Option<&PathBuf>) -> anyhow::Result<()> {
    print!("{}", report::render_markdown(table));
    if let Some(path) = pdf_path {
        pdf::export_table(table, path)?;
        println!("PDF written to {}.", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let course_override = cli.course.as_deref();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Approvals { command } => match command {
            ApprovalsCommand::List { pdf } => {
                let session = require_session(&pool, cli.admin.as_deref()).await?;
                let users = db::fetch_users(&pool).await?;
                let visible = filter::visible_users(&users, &session, course_override);
                emit_table(&report::approvals_table(&visible), pdf.as_ref())?;
            }
            ApprovalsCommand::Approve { user } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                db::approve_user(&pool, user).await?;
                println!("User {user} approved.");
            }
            ApprovalsCommand::Reject { user } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                db::delete_user(&pool, user).await?;
                println!("User {user} rejected and removed.");
            }
        },
        Commands::Students { command } => match command {
            StudentsCommand::List { pdf } => {
                let session = require_session(&pool, cli.admin.as_deref()).await?;
                let users = db::fetch_users(&pool).await?;
                let visible: Vec<models::UserRecord> =
                    filter::visible_users(&users, &session, course_override)
                        .into_iter()
                        .cloned()
                        .collect();
                let sentiments = db::fetch_sentiment_labels(&pool).await?;
                let assessments = db::fetch_assessment_scores(&pool).await?;
                let rows = report::join_student_rows(visible, &sentiments, &assessments);
                emit_table(&report::students_table(&rows), pdf.as_ref())?;
            }
            StudentsCommand::Notify { user } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                let assessment = db::fetch_assessment(&pool, user)
                    .await?
                    .context("no assessment record found for this user")?;

                match lifecycle::notify_outcome(&assessment) {
                    lifecycle::NotifyOutcome::Escalate => {
                        db::mark_notified(&pool, user).await?;
                        log::warn!("user {user} flagged for severe stress");
                        println!("Student is experiencing a severe stress level!");
                    }
                    lifecycle::NotifyOutcome::NoAction { stress_level } => {
                        println!(
                            "Student's stress level is {stress_level} - no immediate action required."
                        );
                    }
                }
            }
        },
        Commands::Monitor { pdf } => {
            require_session(&pool, cli.admin.as_deref()).await?;
            let users = db::fetch_users(&pool).await?;
            let sentiments = db::fetch_sentiment_labels(&pool).await?;
            let assessments = db::fetch_assessment_scores(&pool).await?;
            let rows = report::join_student_rows(users, &sentiments, &assessments);
            emit_table(&report::monitoring_table(&rows), pdf.as_ref())?;
        }
        Commands::Appointments { command } => match command {
            AppointmentsCommand::List => {
                let session = require_session(&pool, cli.admin.as_deref()).await?;
                let intakes = db::fetch_intakes_with_users(&pool).await?;
                let unmatched = intakes.iter().filter(|i| i.user.is_none()).count();
                let visible = filter::visible_intakes(&intakes, &session, course_override);
                print!(
                    "{}",
                    report::render_markdown(&report::appointments_table(&visible))
                );
                if unmatched > 0 {
                    println!("{unmatched} intake(s) have no matching user record.");
                }
            }
            AppointmentsCommand::Schedule {
                user,
                date,
                time,
                message,
                force,
            } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                let message = lifecycle::validate_message(&message)?;

                if !force && !lifecycle::within_business_hours(Local::now().naive_local()) {
                    anyhow::bail!(
                        "appointments can only be set during business hours (Mon-Fri, 8 AM - 5 PM); \
                         pass --force to override"
                    );
                }

                db::fetch_user(&pool, user)
                    .await?
                    .with_context(|| format!("no user found with id {user}"))?;

                let appointment = models::ScheduledAppointment {
                    id: Uuid::new_v4(),
                    user_id: user,
                    scheduled_on: date,
                    scheduled_at: time,
                    message,
                    response_status: lifecycle::STATUS_PENDING.to_string(),
                };
                db::insert_scheduled(&pool, &appointment).await?;
                println!(
                    "Appointment {} scheduled for {} at {}.",
                    appointment.id, date, time
                );
            }
            AppointmentsCommand::Scheduled { user } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                let mut appointments = db::fetch_scheduled(&pool, user).await?;
                lifecycle::sort_newest_first(&mut appointments);
                print!(
                    "{}",
                    report::render_markdown(&report::scheduled_table(&appointments))
                );
            }
            AppointmentsCommand::Finish {
                appointment,
                remarks,
            } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                let remarks = lifecycle::validate_remarks(&remarks)?;

                let scheduled = db::fetch_scheduled_by_id(&pool, appointment)
                    .await?
                    .with_context(|| format!("no scheduled appointment with id {appointment}"))?;
                let user = db::fetch_user(&pool, scheduled.user_id)
                    .await?
                    .with_context(|| format!("no user record for appointment {appointment}"))?;

                let record = lifecycle::history_record(
                    &user,
                    &scheduled,
                    &remarks,
                    Local::now().naive_local(),
                );
                let intake_deleted =
                    db::finish_appointment(&pool, &record, appointment, scheduled.user_id).await?;

                println!("Appointment {appointment} finished and recorded in history.");
                if intake_deleted {
                    println!("No sessions remain; the intake request was removed.");
                }
            }
        },
        Commands::History { pdf } => {
            require_session(&pool, cli.admin.as_deref()).await?;
            let records = db::fetch_history(&pool).await?;
            print!("{}", report::build_history_report(&records));
            if let Some(path) = pdf {
                pdf::export_table(&report::history_table(&records), &path)?;
                println!("PDF written to {}.", path.display());
            }
        }
        Commands::Dashboard { pdf } => {
            require_session(&pool, cli.admin.as_deref()).await?;
            let assessments = db::fetch_assessment_scores(&pool).await?;
            let users = db::fetch_users(&pool).await?;
            print!("{}", report::build_dashboard_report(&assessments, &users));
            if let Some(path) = pdf {
                pdf::export_table(&report::dashboard_table(&assessments), &path)?;
                println!("PDF written to {}.", path.display());
            }
        }
        Commands::Roster { command } => match command {
            RosterCommand::Import { csv, json } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                let entries = if let Some(path) = csv {
                    roster::parse_csv(&path)?
                } else if let Some(path) = json {
                    roster::parse_json(&path)?
                } else {
                    unreachable!("clap enforces exactly one source")
                };
                let inserted = db::upsert_roster(&pool, &entries).await?;
                println!("Imported {inserted} roster entries.");
            }
            RosterCommand::List { search, pdf } => {
                require_session(&pool, cli.admin.as_deref()).await?;
                let entries = db::fetch_roster(&pool).await?;
                let selected = match search.as_deref() {
                    Some(query) => roster::search(&entries, query),
                    None => entries.iter().collect(),
                };
                emit_table(&report::roster_table(&selected), pdf.as_ref())?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_are_rejected_without_an_admin_email() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/counseling_office")
            .unwrap();

        let err = require_session(&pool, None).await.unwrap_err();
        assert!(err.to_string().contains("--admin"));
    }
}
