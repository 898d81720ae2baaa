use crate::models::{AdminSession, IntakeWithUser, UserRecord};

/// Case- and whitespace-insensitive course comparison key.
pub fn normalize_course(value: &str) -> String {
    value.trim().to_lowercase()
}

fn matches_course(user: &UserRecord, wanted: &str) -> bool {
    user.course_or_department()
        .map(|course| normalize_course(course) == normalize_course(wanted))
        .unwrap_or(false)
}

fn matches_scope(user: &UserRecord, scope: &[String]) -> bool {
    user.course_or_department()
        .map(|course| {
            let key = normalize_course(course);
            scope.iter().any(|entry| normalize_course(entry) == key)
        })
        .unwrap_or(false)
}

/// The one visibility filter shared by every screen.
///
/// A single-course override (the dropdown selection) narrows any session,
/// including the super admin. Without an override, scoped sessions see only
/// the users whose course -- or department, when no course is set -- matches
/// their assigned course list; unscoped sessions see everything.
pub fn user_visible(
    user: &UserRecord,
    session: &AdminSession,
    override_course: Option<&str>,
) -> bool {
    match override_course {
        Some(wanted) => matches_course(user, wanted),
        None => !session.is_scoped() || matches_scope(user, &session.course_scope),
    }
}

pub fn visible_users<'a>(
    users: &'a [UserRecord],
    session: &AdminSession,
    override_course: Option<&str>,
) -> Vec<&'a UserRecord> {
    let selected = users
        .iter()
        .filter(|user| user_visible(user, session, override_course))
        .collect::<Vec<_>>();

    log::debug!(
        "visibility filter: {} of {} users for {} (override: {:?})",
        selected.len(),
        users.len(),
        session.email,
        override_course
    );
    selected
}

/// Intake requests share the user visibility rules; intakes without a user
/// record are never visible here (the caller reports them separately).
pub fn visible_intakes<'a>(
    intakes: &'a [IntakeWithUser],
    session: &AdminSession,
    override_course: Option<&str>,
) -> Vec<&'a IntakeWithUser> {
    intakes
        .iter()
        .filter(|entry| {
            entry
                .user
                .as_ref()
                .map(|user| user_visible(user, session, override_course))
                .unwrap_or(false)
        })
        .collect()
}
