//! Contracts for the gatekeeper's external collaborators.
//!
//! The identity provider resolves sessions from request cookies; the user
//! directory answers approval and role questions. Both are injected as trait
//! objects so tests and alternative deployments can swap them out.

use crate::error::{LookupError, ProviderError};
use crate::role::Role;
use crate::session::Session;
use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;
use lectern_core::UserId;
use std::sync::Arc;

/// Client for the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves the session carried by the request cookies in `jar`.
    ///
    /// Returns `Ok(None)` when the caller is simply not signed in. The
    /// provider may add or remove cookies in `jar` (e.g., after refreshing
    /// tokens); the gatekeeper attaches the final jar to its response.
    async fn get_session(&self, jar: &mut CookieJar) -> Result<Option<Session>, ProviderError>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn get_session(&self, jar: &mut CookieJar) -> Result<Option<Session>, ProviderError> {
        (**self).get_session(jar).await
    }
}

/// Approval status and role stored on a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRecord {
    /// Whether an administrator approved the user.
    pub is_approved: bool,
    /// The user's role.
    pub role: Role,
}

/// Point reads against the user records in the persistence layer.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up the approval status and role of `user_id`.
    async fn lookup_user(&self, user_id: &UserId) -> lectern_core::Result<UserRecord, LookupError>;
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn lookup_user(&self, user_id: &UserId) -> lectern_core::Result<UserRecord, LookupError> {
        (**self).lookup_user(user_id).await
    }
}
