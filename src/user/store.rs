//! User profile lookups

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::user::UserProfile;

#[derive(Clone)]
pub struct UserStore {
    db_pool: PgPool,
}

impl UserStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Fetch a user profile by id
    pub async fn find(&self, user_id: Uuid) -> ApiResult<UserProfile> {
        let user = sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;

        user.ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))
    }
}
