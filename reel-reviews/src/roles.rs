//! Role relation reads

use async_trait::async_trait;
use reel_common::UserId;
use sqlx::{Row, SqlitePool};

use crate::error::StoreError;

/// Point reads against the role relation
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Whether `user` holds the administrator role; no record means no
    async fn is_admin(&self, user: &UserId) -> Result<bool, StoreError>;
}

/// Role relation stored in the `role_assignments` table
#[derive(Clone)]
pub struct SqliteRoleDirectory {
    pool: SqlitePool,
}

impl SqliteRoleDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleDirectory for SqliteRoleDirectory {
    async fn is_admin(&self, user: &UserId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT is_admin FROM role_assignments WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<bool, _>("is_admin")).unwrap_or(false))
    }
}
