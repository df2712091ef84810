//! Role types for platform access control.
//!
//! Roles live on the user record in the persistence layer, not in the
//! session. The gatekeeper reads them through the approval cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Privilege tier attached to a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Learner with access to assigned content.
    Student,
    /// Instructor who manages their own classes and content.
    Teacher,
    /// Instructor with oversight of other teachers.
    HeadTeacher,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns the storage representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::HeadTeacher => "head_teacher",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored role string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    value: String,
}

impl ParseRoleError {
    /// Returns the rejected value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized role '{}'", self.value)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Records written by older clients use camel case or hyphens.
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "head_teacher" | "headteacher" => Ok(Self::HeadTeacher),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError {
                value: s.to_string(),
            }),
        }
    }
}
