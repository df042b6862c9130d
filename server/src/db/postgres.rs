use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::AbstractDatabase;
use crate::models::{
    AttendeeEntry, AttendeeProfile, Event, EventChanges, EventSummary, JoinedEvent, Role, User,
    UserProfile,
};
use crate::utils::error::AppError;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

const EVENT_COLUMNS: &str = "id, title, date, address, city, promoter_id, is_finished, created_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, level, role, created_at";

#[derive(Clone)]
pub struct PostgresDb {
    pool: PgPool,
}

impl PostgresDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    level: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            level: row.level,
            role: Role::from_db(&row.role),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AttendeeRow {
    id: Uuid,
    event_id: Uuid,
    username: String,
    level: String,
    email: String,
}

impl From<AttendeeRow> for AttendeeEntry {
    fn from(row: AttendeeRow) -> Self {
        AttendeeEntry {
            id: row.id,
            event_id: row.event_id,
            user: AttendeeProfile {
                username: row.username,
                level: row.level,
                email: row.email,
            },
        }
    }
}

/// Turn constraint violations into client errors, everything else stays a database error.
fn map_constraint(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                return AppError::NotFound(format!("{} references a missing record", what))
            }
            Some(UNIQUE_VIOLATION) => {
                return AppError::ValidationError(format!("{} already exists", what))
            }
            _ => {}
        }
    }
    AppError::DatabaseError(err)
}

#[async_trait]
impl AbstractDatabase for PostgresDb {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, level, role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.level)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "user"))?;
        Ok(())
    }

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn fetch_user_profiles(&self) -> Result<Vec<UserProfile>, AppError> {
        let profiles = sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, level FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        password_hash: Option<String>,
        level: Option<String>,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET password_hash = COALESCE($2, password_hash),
                 level = COALESCE($3, level)
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(password_hash)
        .bind(level)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM attendances
             WHERE user_id = $1
                OR event_id IN (SELECT id FROM events WHERE promoter_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM events WHERE promoter_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO events (id, title, date, address, city, promoter_id, is_finished, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.date)
        .bind(&event.address)
        .bind(&event.city)
        .bind(event.promoter_id)
        .bind(event.is_finished)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "event"))?;
        Ok(())
    }

    async fn fetch_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn fetch_events(&self) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events ORDER BY date, id",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn fetch_open_events_in_city(
        &self,
        city: &str,
    ) -> Result<Vec<EventSummary>, AppError> {
        let events = sqlx::query_as::<_, EventSummary>(
            "SELECT id, title, date, city FROM events
             WHERE city = $1 AND is_finished = FALSE
             ORDER BY date, id",
        )
        .bind(city)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn fetch_promoted_events(
        &self,
        promoter_id: Uuid,
    ) -> Result<Vec<EventSummary>, AppError> {
        let events = sqlx::query_as::<_, EventSummary>(
            "SELECT id, title, date, city FROM events
             WHERE promoter_id = $1
             ORDER BY date, id",
        )
        .bind(promoter_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: &EventChanges,
    ) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events
             SET title = COALESCE($2, title),
                 date = COALESCE($3, date)
             WHERE id = $1
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn close_event(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE events SET is_finished = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, AppError> {
        // The foreign key cascades too; the explicit delete keeps the order visible.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM attendances WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    async fn join_event(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO attendances (id, event_id, user_id, created_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (event_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "attendance"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn leave_event(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM attendances WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn fetch_attendees(&self, event_id: Uuid) -> Result<Vec<AttendeeEntry>, AppError> {
        let rows = sqlx::query_as::<_, AttendeeRow>(
            "SELECT a.id, a.event_id, u.username, u.level, u.email
             FROM attendances a
             JOIN users u ON u.id = a.user_id
             WHERE a.event_id = $1
             ORDER BY a.created_at, a.id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AttendeeEntry::from).collect())
    }

    async fn fetch_joined_events(&self, user_id: Uuid) -> Result<Vec<JoinedEvent>, AppError> {
        let events = sqlx::query_as::<_, JoinedEvent>(
            "SELECT e.title, e.city, e.date
             FROM attendances a
             JOIN events e ON e.id = a.event_id
             WHERE a.user_id = $1 AND e.is_finished = FALSE
             ORDER BY e.date, e.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
