//! Admin route guard.
//!
//! Admin pages are the highest-privilege surface, so this guard fails
//! closed: if the user's role cannot be established, access is denied.

use crate::cache::ApprovalCache;
use crate::decision::AuthDecision;
use crate::provider::UserDirectory;
use crate::session::Session;
use tracing::{debug, warn};

/// Checks that a signed-in user may enter the admin section.
pub struct AdminGuard<'a> {
    cache: &'a ApprovalCache,
    directory: &'a dyn UserDirectory,
    privileged_email: Option<&'a str>,
}

impl<'a> AdminGuard<'a> {
    /// Creates a guard over the shared cache and user directory.
    #[must_use]
    pub fn new(
        cache: &'a ApprovalCache,
        directory: &'a dyn UserDirectory,
        privileged_email: Option<&'a str>,
    ) -> Self {
        Self {
            cache,
            directory,
            privileged_email,
        }
    }

    /// Returns [`AuthDecision::Allow`] for administrators and a permission
    /// error for everyone else.
    pub async fn guard(&self, session: &Session) -> AuthDecision {
        let user_id = session.user_id();

        if self
            .privileged_email
            .is_some_and(|email| session.email_matches(email))
        {
            debug!(%user_id, "privileged account admitted to admin section");
            return AuthDecision::Allow;
        }

        if self
            .cache
            .get(user_id)
            .is_some_and(|record| record.role.is_admin())
        {
            debug!(%user_id, "cached admin role admitted");
            return AuthDecision::Allow;
        }

        match self.directory.lookup_user(user_id).await {
            Ok(record) if record.role.is_admin() => {
                self.cache.put(user_id.clone(), record.is_approved, record.role);
                AuthDecision::Allow
            }
            Ok(record) => {
                debug!(%user_id, role = %record.role, "non-admin denied admin section");
                AuthDecision::admin_required()
            }
            Err(err) => {
                warn!(%user_id, error = %err, "role lookup failed; denying admin access");
                AuthDecision::admin_required()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::provider::UserRecord;
    use crate::role::Role;
    use async_trait::async_trait;
    use chrono::Duration;
    use lectern_core::UserId;
    use rootcause::Report;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        result: Result<UserRecord, LookupError>,
        calls: AtomicUsize,
    }

    impl CountingDirectory {
        fn new(result: Result<UserRecord, LookupError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserDirectory for CountingDirectory {
        async fn lookup_user(&self, _user_id: &UserId) -> Result<UserRecord, Report<LookupError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(Report::from)
        }
    }

    fn session(email: &str) -> Session {
        Session::new(UserId::new("usr-1"), "token".to_string()).with_email(Some(email.to_string()))
    }

    fn cache() -> ApprovalCache {
        ApprovalCache::new(Duration::minutes(15), 100)
    }

    fn record(role: Role) -> Result<UserRecord, LookupError> {
        Ok(UserRecord {
            is_approved: true,
            role,
        })
    }

    #[tokio::test]
    async fn privileged_email_skips_lookup() {
        let cache = cache();
        let directory = CountingDirectory::new(record(Role::Student));
        let guard = AdminGuard::new(&cache, &directory, Some("owner@example.com"));

        let decision = guard.guard(&session("OWNER@example.com")).await;

        assert_eq!(decision, AuthDecision::Allow);
        assert_eq!(directory.calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cached_admin_skips_lookup() {
        let cache = cache();
        cache.put(UserId::new("usr-1"), true, Role::Admin);
        let directory = CountingDirectory::new(record(Role::Student));
        let guard = AdminGuard::new(&cache, &directory, None);

        assert_eq!(guard.guard(&session("a@example.com")).await, AuthDecision::Allow);
        assert_eq!(directory.calls(), 0);
    }

    #[tokio::test]
    async fn cached_non_admin_falls_through_to_lookup() {
        let cache = cache();
        cache.put(UserId::new("usr-1"), true, Role::Teacher);
        let directory = CountingDirectory::new(record(Role::Admin));
        let guard = AdminGuard::new(&cache, &directory, None);

        assert_eq!(guard.guard(&session("a@example.com")).await, AuthDecision::Allow);
        assert_eq!(directory.calls(), 1);
        assert_eq!(
            cache.get(&UserId::new("usr-1")).map(|r| r.role),
            Some(Role::Admin)
        );
    }

    #[tokio::test]
    async fn looked_up_admin_is_cached() {
        let cache = cache();
        let directory = CountingDirectory::new(record(Role::Admin));
        let guard = AdminGuard::new(&cache, &directory, None);

        assert_eq!(guard.guard(&session("a@example.com")).await, AuthDecision::Allow);
        assert_eq!(guard.guard(&session("a@example.com")).await, AuthDecision::Allow);
        assert_eq!(directory.calls(), 1);
    }

    #[tokio::test]
    async fn non_admin_is_denied_and_not_cached() {
        let cache = cache();
        let directory = CountingDirectory::new(record(Role::HeadTeacher));
        let guard = AdminGuard::new(&cache, &directory, Some("owner@example.com"));

        let decision = guard.guard(&session("teacher@example.com")).await;

        assert_eq!(decision, AuthDecision::admin_required());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_fails_closed() {
        let cache = cache();
        let directory = CountingDirectory::new(Err(LookupError::Unavailable {
            details: "connection refused".to_string(),
        }));
        let guard = AdminGuard::new(&cache, &directory, None);

        let decision = guard.guard(&session("a@example.com")).await;

        assert_eq!(decision, AuthDecision::admin_required());
        assert!(cache.is_empty());
    }
}
