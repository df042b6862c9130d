use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    AttendeeEntry, Event, EventChanges, EventSummary, JoinedEvent, User, UserProfile,
};
use crate::utils::error::AppError;

mod postgres;
mod reference;

pub use postgres::PostgresDb;
pub use reference::ReferenceDb;

/// Storage seam shared by every handler.
///
/// Each method is a single atomic step from the caller's point of view. Drivers
/// are responsible for the attendance uniqueness rule and for cascading deletes.
#[async_trait]
pub trait AbstractDatabase: Sync + Send {
    /// Insert a new account
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Fetch an account by its id
    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Fetch the public profile of every account
    async fn fetch_user_profiles(&self) -> Result<Vec<UserProfile>, AppError>;

    /// Replace the password hash and/or level, returning the updated account
    async fn update_profile(
        &self,
        id: Uuid,
        password_hash: Option<String>,
        level: Option<String>,
    ) -> Result<Option<User>, AppError>;

    /// Delete an account together with its attendances and promoted events
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    async fn insert_event(&self, event: &Event) -> Result<(), AppError>;

    async fn fetch_event(&self, id: Uuid) -> Result<Option<Event>, AppError>;

    /// Every event, finished or not
    async fn fetch_events(&self) -> Result<Vec<Event>, AppError>;

    /// Unfinished events held in `city`
    async fn fetch_open_events_in_city(&self, city: &str)
        -> Result<Vec<EventSummary>, AppError>;

    async fn fetch_promoted_events(&self, promoter_id: Uuid)
        -> Result<Vec<EventSummary>, AppError>;

    async fn update_event(
        &self,
        id: Uuid,
        changes: &EventChanges,
    ) -> Result<Option<Event>, AppError>;

    /// Mark an event finished. Returns false if it does not exist.
    async fn close_event(&self, id: Uuid) -> Result<bool, AppError>;

    /// Delete an event and every attendance pointing at it
    async fn delete_event(&self, id: Uuid) -> Result<bool, AppError>;

    /// Record that `user_id` joins `event_id`. Returns true if a new record was created.
    async fn join_event(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    /// Remove the (event, user) attendance. Returns true if one was removed.
    async fn leave_event(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    async fn fetch_attendees(&self, event_id: Uuid) -> Result<Vec<AttendeeEntry>, AppError>;

    /// Unfinished events `user_id` has joined
    async fn fetch_joined_events(&self, user_id: Uuid) -> Result<Vec<JoinedEvent>, AppError>;
}

pub type Database = Arc<dyn AbstractDatabase>;

/// Connect to Postgres when a database url is configured, otherwise fall back
/// to the in-memory reference store.
pub async fn connect(config: &Config) -> Result<Database, AppError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await?;

            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .map_err(|e| AppError::InternalServerError(format!("Migration failed: {}", e)))?;

            tracing::info!("Migrations run successfully");

            Ok(Arc::new(PostgresDb::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory reference store");
            Ok(Arc::new(ReferenceDb::default()))
        }
    }
}
