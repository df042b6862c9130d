use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::require_text;
use crate::utils::error::AppError;

/// An event published by its promoter.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub address: String,
    pub city: String,
    pub promoter_id: Uuid,
    pub is_finished: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(input: NewEvent, promoter_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            date: input.date,
            address: input.address,
            city: input.city,
            promoter_id,
            is_finished: false,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            title: self.title.clone(),
            date: self.date,
            city: self.city.clone(),
        }
    }
}

/// Public projection used by the city listing and the promoted listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    pub address: String,
    pub city: String,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)?;
        require_text("address", &self.address)?;
        require_text("city", &self.city)
    }
}

/// Fields a promoter may change after creation. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventChanges {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl EventChanges {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.is_none() && self.date.is_none() {
            return Err(AppError::ValidationError(
                "Nothing to update: provide 'title' and/or 'date'".to_string(),
            ));
        }
        match &self.title {
            Some(title) => require_text("title", title),
            None => Ok(()),
        }
    }

    pub fn apply(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(date) = self.date {
            event.date = date;
        }
    }
}
