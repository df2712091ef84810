//! Request authorization gatekeeper for the lectern platform.
//!
//! This crate decides, once per inbound request, whether the request may
//! proceed or must be redirected to login, to the pending-approval page, to
//! the admin section, or to the error page:
//! - Route classification (`RouteTable`, `RouteClass`)
//! - Approval caching (`ApprovalCache`)
//! - Session validation and error classification (`SessionValidator`)
//! - The decision engine and admin guard (`Gatekeeper`, `AdminGuard`)
//!
//! The identity provider and the user records are external; they are
//! reached through the [`IdentityProvider`] and [`UserDirectory`] traits.
//!
//! # Example
//!
//! ```
//! use lectern_platform_access::{AuthDecision, RouteClass, RouteTable};
//!
//! let routes = RouteTable::default();
//! assert_eq!(routes.classify("/admin/users"), RouteClass::Admin);
//! assert_eq!(routes.classify("/dashboard"), RouteClass::Protected);
//!
//! let decision = AuthDecision::RedirectLogin {
//!     return_to: Some("/dashboard".to_string()),
//! };
//! assert_eq!(
//!     decision.location(&routes).as_deref(),
//!     Some("/auth/login?returnTo=%2Fdashboard"),
//! );
//! ```

pub mod cache;
pub mod config;
pub mod decision;
pub mod error;
pub mod gatekeeper;
pub mod guard;
pub mod provider;
pub mod return_to;
pub mod role;
pub mod route;
pub mod session;
pub mod validator;

// Re-export main types at crate root
pub use cache::{ApprovalCache, ApprovalRecord, Clock, SystemClock};
pub use config::{GatekeeperConfig, LookupFailurePolicy, ProviderConfig, ProviderCredentials};
pub use decision::{AuthDecision, ErrorKind};
pub use error::{ConfigurationError, LookupError, ProviderError, SessionError};
pub use gatekeeper::{Gatekeeper, RequestContext};
pub use guard::AdminGuard;
pub use provider::{IdentityProvider, UserDirectory, UserRecord};
pub use return_to::{ReturnPathValidator, sanitize_return_to};
pub use role::{ParseRoleError, Role};
pub use route::{RouteClass, RouteTable};
pub use session::Session;
pub use validator::SessionValidator;
