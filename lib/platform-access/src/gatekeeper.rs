//! The authorization decision engine.
//!
//! [`Gatekeeper::evaluate`] runs once per request and is read-only apart
//! from populating the approval cache. Rules are checked in order and the
//! first match wins:
//!
//! 1. public and auth-flow routes are allowed without touching the session;
//! 2. a failed session lookup redirects to the error page;
//! 3. a missing session redirects to login with a sanitized return target;
//! 4. admin routes defer to the [`AdminGuard`];
//! 5. protected routes require an approved user record, and administrators
//!    landing on the site root are forwarded to the admin section;
//! 6. anything else is allowed.

use crate::cache::ApprovalCache;
use crate::config::GatekeeperConfig;
use crate::decision::AuthDecision;
use crate::guard::AdminGuard;
use crate::provider::{IdentityProvider, UserDirectory, UserRecord};
use crate::return_to::{ReturnPathValidator, sanitize_return_to};
use crate::route::{RouteClass, RouteTable};
use crate::session::Session;
use crate::validator::SessionValidator;
use axum_extra::extract::cookie::CookieJar;
use lectern_core::UserId;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Site root, where administrators are auto-forwarded to the admin section.
const SITE_ROOT: &str = "/";

/// The parts of an inbound request the gatekeeper looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    path: &'a str,
    referer: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    /// Creates a context for a request to `path` (as it appears in the URI).
    #[must_use]
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            referer: None,
        }
    }

    /// Sets the `Referer` header value.
    #[must_use]
    pub fn with_referer(mut self, referer: Option<&'a str>) -> Self {
        self.referer = referer;
        self
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Returns the `Referer` header value, if any.
    #[must_use]
    pub fn referer(&self) -> Option<&'a str> {
        self.referer
    }
}

/// Per-process authorization engine.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the
/// [`ApprovalCache`].
pub struct Gatekeeper {
    config: GatekeeperConfig,
    cache: Arc<ApprovalCache>,
    validator: SessionValidator,
    directory: Arc<dyn UserDirectory>,
    return_paths: ReturnPathValidator,
}

impl Gatekeeper {
    /// Creates a gatekeeper from its collaborators.
    #[must_use]
    pub fn new(
        config: GatekeeperConfig,
        cache: Arc<ApprovalCache>,
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let return_paths =
            ReturnPathValidator::with_allowed_prefixes(config.return_to_prefixes().to_vec());
        Self {
            config,
            cache,
            validator: SessionValidator::new(provider),
            directory,
            return_paths,
        }
    }

    /// Returns the route table used for classification and redirects.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        self.config.routes()
    }

    /// Returns the shared approval cache.
    #[must_use]
    pub fn cache(&self) -> &ApprovalCache {
        &self.cache
    }

    /// Decides what happens to a request.
    ///
    /// Cookie changes made by the identity provider are left in `jar`; the
    /// caller must attach them to whatever response it sends.
    #[instrument(skip_all, fields(path = %request.path()))]
    pub async fn evaluate(&self, request: &RequestContext<'_>, jar: &mut CookieJar) -> AuthDecision {
        let class = self.routes().classify(request.path());
        let decision = self.decide(class, request, jar).await;
        debug!(route = %class, decision = decision.label(), "authorization decided");
        decision
    }

    async fn decide(
        &self,
        class: RouteClass,
        request: &RequestContext<'_>,
        jar: &mut CookieJar,
    ) -> AuthDecision {
        if class.is_open() {
            return AuthDecision::Allow;
        }

        let session = match self.validator.validate(jar).await {
            Ok(session) => session,
            Err(err) => return AuthDecision::session_failure(&err),
        };

        let Some(session) = session else {
            return AuthDecision::RedirectLogin {
                return_to: sanitize_return_to(request.path(), &self.return_paths),
            };
        };

        match class {
            RouteClass::Admin => {
                AdminGuard::new(
                    &self.cache,
                    self.directory.as_ref(),
                    self.config.privileged_email(),
                )
                .guard(&session)
                .await
            }
            RouteClass::Protected if !self.routes().is_pending_page(request.path()) => {
                self.check_approval(&session, request).await
            }
            _ => AuthDecision::Allow,
        }
    }

    async fn check_approval(&self, session: &Session, request: &RequestContext<'_>) -> AuthDecision {
        let record = self.approval_record(session.user_id()).await;

        if !record.is_approved {
            return AuthDecision::RedirectPending;
        }

        let is_admin = record.role.is_admin()
            || self
                .config
                .privileged_email()
                .is_some_and(|email| session.email_matches(email));
        if is_admin && request.path() == SITE_ROOT && !self.came_from_admin(request.referer()) {
            return AuthDecision::RedirectAdmin;
        }

        AuthDecision::Allow
    }

    /// Resolves approval status from the cache, falling back to the user
    /// directory and then to the configured lookup-failure policy.
    async fn approval_record(&self, user_id: &UserId) -> UserRecord {
        if let Some(cached) = self.cache.get(user_id) {
            debug!(%user_id, "approval cache hit");
            return UserRecord {
                is_approved: cached.is_approved,
                role: cached.role,
            };
        }

        let record = match self.directory.lookup_user(user_id).await {
            Ok(record) => record,
            Err(err) => {
                let policy = self.config.lookup_failure();
                warn!(
                    %user_id,
                    error = %err,
                    assumed_approved = policy.is_approved,
                    assumed_role = %policy.role,
                    "approval lookup failed; applying fallback policy"
                );
                UserRecord {
                    is_approved: policy.is_approved,
                    role: policy.role,
                }
            }
        };
        self.cache
            .put(user_id.clone(), record.is_approved, record.role);
        record
    }

    fn came_from_admin(&self, referer: Option<&str>) -> bool {
        let Some(referer) = referer else {
            return false;
        };
        let prefix = self.routes().admin_prefix();
        match Url::parse(referer) {
            Ok(url) => url.path().starts_with(prefix),
            Err(_) => referer.contains(prefix),
        }
    }
}
