//! Database access to user approval records.

use async_trait::async_trait;
use lectern_core::UserId;
use lectern_platform_access::{LookupError, Role, UserDirectory, UserRecord};
use sqlx::{FromRow, PgPool};

/// Row type for profile queries.
#[derive(FromRow)]
struct ProfileRow {
    is_approved: bool,
    role: String,
}

impl ProfileRow {
    fn try_into_record(self, user_id: &UserId) -> Result<UserRecord, LookupError> {
        let role: Role = self.role.parse().map_err(|_| LookupError::InvalidRole {
            user_id: user_id.clone(),
            value: self.role.clone(),
        })?;
        Ok(UserRecord {
            is_approved: self.is_approved,
            role,
        })
    }
}

/// Repository for user profiles.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    #[tracing::instrument(skip(self))]
    async fn lookup_user(&self, user_id: &UserId) -> lectern_core::Result<UserRecord, LookupError> {
        // `id` may be a uuid column; compare as text so any opaque id binds.
        let row: Option<ProfileRow> =
            sqlx::query_as(r#"SELECT is_approved, role FROM profiles WHERE id::text = $1"#)
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LookupError::Unavailable {
                    details: e.to_string(),
                })?;

        let row = row.ok_or_else(|| LookupError::NotFound {
            user_id: user_id.clone(),
        })?;

        Ok(row.try_into_record(user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> ProfileRow {
        ProfileRow {
            is_approved: false,
            role: role.to_string(),
        }
    }

    #[test]
    fn row_maps_to_record() {
        let record = row("head_teacher")
            .try_into_record(&UserId::new("usr-1"))
            .unwrap();

        assert!(!record.is_approved);
        assert_eq!(record.role, Role::HeadTeacher);
    }

    #[test]
    fn unknown_role_is_reported() {
        let err = row("janitor")
            .try_into_record(&UserId::new("usr-1"))
            .unwrap_err();

        assert!(matches!(
            err,
            LookupError::InvalidRole { ref value, .. } if value == "janitor"
        ));
    }
}
