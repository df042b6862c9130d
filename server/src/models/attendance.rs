use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Junction record: `user_id` takes part in `event_id`.
/// At most one exists per (event, user) pair.
#[derive(Debug, Clone)]
pub struct Attendance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Attendance {
    pub fn new(event_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendeeProfile {
    pub username: String,
    pub level: String,
    pub email: String,
}

/// One row of the event detail view. The attendee's own user id is left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendeeEntry {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user: AttendeeProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JoinedEvent {
    pub title: String,
    pub city: String,
    pub date: DateTime<Utc>,
}
