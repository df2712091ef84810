//! Core domain types and utilities for the lectern platform.
//!
//! This crate provides the foundational types and error handling shared by
//! the request gatekeeper and the server that hosts it.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, UserId};
