use anyhow::Context;
use sqlx::PgPool;

use crate::db;
use crate::models::AdminSession;

/// Head counselor account that bypasses all course filtering.
pub const DEFAULT_SUPER_ADMIN_EMAIL: &str = "guidance.head@school.edu";

pub fn super_admin_email() -> String {
    std::env::var("SUPER_ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_SUPER_ADMIN_EMAIL.to_string())
}

pub fn is_super_admin(email: &str, sentinel: &str) -> bool {
    email.trim().eq_ignore_ascii_case(sentinel.trim())
}

/// Resolve the acting admin for this invocation. Sign-in identity alone is
/// not enough; an authorization record must exist, and its absence is
/// reported with the same generic message as an unknown account.
pub async fn resolve(pool: &PgPool, email: &str) -> anyhow::Result<AdminSession> {
    let account = db::fetch_admin_account(pool, email)
        .await
        .context("failed to look up admin account")?;

    let Some((role, course_scope)) = account else {
        anyhow::bail!("admin permission needed");
    };

    let session = AdminSession {
        email: email.to_string(),
        role,
        course_scope,
        is_super_admin: is_super_admin(email, &super_admin_email()),
    };
    log::debug!(
        "session resolved for {} (role {}, {} courses in scope)",
        session.email,
        session.role,
        session.course_scope.len()
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_match_ignores_case_and_whitespace() {
        assert!(is_super_admin(
            "  Guidance.Head@School.EDU ",
            DEFAULT_SUPER_ADMIN_EMAIL
        ));
        assert!(!is_super_admin(
            "counselor@school.edu",
            DEFAULT_SUPER_ADMIN_EMAIL
        ));
    }
}
