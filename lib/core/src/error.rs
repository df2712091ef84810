//! Shared result alias.
//!
//! Failures are carried as rootcause reports. Crates define their own
//! context types (lookup failures, configuration problems) and name them as
//! the second parameter.

use rootcause::Report;

/// Result whose error is a [`Report`] over the context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
