use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::AbstractDatabase;
use crate::models::{
    Attendance, AttendeeEntry, AttendeeProfile, Event, EventChanges, EventSummary, JoinedEvent,
    User, UserProfile,
};
use crate::utils::error::AppError;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    /// Keyed by (event, user) so a pair can only ever hold one record.
    attendances: HashMap<(Uuid, Uuid), Attendance>,
}

/// In-memory store. Every operation runs under one lock, so cascades are atomic.
#[derive(Clone, Default)]
pub struct ReferenceDb {
    tables: Arc<Mutex<Tables>>,
}

impl ReferenceDb {
    /// Number of attendance records currently stored, across all events.
    pub async fn attendance_count(&self) -> usize {
        self.tables.lock().await.attendances.len()
    }
}

fn sorted_events<'a>(events: impl Iterator<Item = &'a Event>) -> Vec<&'a Event> {
    let mut events: Vec<&Event> = events.collect();
    events.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    events
}

#[async_trait]
impl AbstractDatabase for ReferenceDb {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.id == user.id || u.username == user.username || u.email == user.email);
        if taken {
            return Err(AppError::ValidationError("user already exists".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn fetch_user_profiles(&self) -> Result<Vec<UserProfile>, AppError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<&User> = tables.users.values().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users.into_iter().map(User::profile).collect())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        password_hash: Option<String>,
        level: Option<String>,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        if let Some(level) = level {
            user.level = level;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.events.retain(|_, event| event.promoter_id != id);
        let Tables {
            events,
            attendances,
            ..
        } = &mut *tables;
        attendances.retain(|(event_id, user_id), _| {
            *user_id != id && events.contains_key(event_id)
        });
        Ok(true)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&event.promoter_id) {
            return Err(AppError::NotFound(
                "event references a missing record".to_string(),
            ));
        }
        if tables.events.contains_key(&event.id) {
            return Err(AppError::ValidationError("event already exists".to_string()));
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn fetch_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }

    async fn fetch_events(&self) -> Result<Vec<Event>, AppError> {
        let tables = self.tables.lock().await;
        Ok(sorted_events(tables.events.values())
            .into_iter()
            .cloned()
            .collect())
    }

    async fn fetch_open_events_in_city(
        &self,
        city: &str,
    ) -> Result<Vec<EventSummary>, AppError> {
        let tables = self.tables.lock().await;
        let open = tables
            .events
            .values()
            .filter(|e| e.city == city && !e.is_finished);
        Ok(sorted_events(open).into_iter().map(Event::summary).collect())
    }

    async fn fetch_promoted_events(
        &self,
        promoter_id: Uuid,
    ) -> Result<Vec<EventSummary>, AppError> {
        let tables = self.tables.lock().await;
        let promoted = tables
            .events
            .values()
            .filter(|e| e.promoter_id == promoter_id);
        Ok(sorted_events(promoted)
            .into_iter()
            .map(Event::summary)
            .collect())
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: &EventChanges,
    ) -> Result<Option<Event>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.events.get_mut(&id).map(|event| {
            changes.apply(event);
            event.clone()
        }))
    }

    async fn close_event(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        match tables.events.get_mut(&id) {
            Some(event) => {
                event.is_finished = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        tables.attendances.retain(|(event_id, _), _| *event_id != id);
        Ok(tables.events.remove(&id).is_some())
    }

    async fn join_event(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.events.contains_key(&event_id) || !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound(
                "attendance references a missing record".to_string(),
            ));
        }
        if tables.attendances.contains_key(&(event_id, user_id)) {
            return Ok(false);
        }
        tables
            .attendances
            .insert((event_id, user_id), Attendance::new(event_id, user_id));
        Ok(true)
    }

    async fn leave_event(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.attendances.remove(&(event_id, user_id)).is_some())
    }

    async fn fetch_attendees(&self, event_id: Uuid) -> Result<Vec<AttendeeEntry>, AppError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<&Attendance> = tables
            .attendances
            .values()
            .filter(|a| a.event_id == event_id)
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(records
            .into_iter()
            .filter_map(|a| {
                tables.users.get(&a.user_id).map(|user| AttendeeEntry {
                    id: a.id,
                    event_id: a.event_id,
                    user: AttendeeProfile {
                        username: user.username.clone(),
                        level: user.level.clone(),
                        email: user.email.clone(),
                    },
                })
            })
            .collect())
    }

    async fn fetch_joined_events(&self, user_id: Uuid) -> Result<Vec<JoinedEvent>, AppError> {
        let tables = self.tables.lock().await;
        let joined = tables
            .attendances
            .keys()
            .filter(|(_, attendee)| *attendee == user_id)
            .filter_map(|(event_id, _)| tables.events.get(event_id))
            .filter(|event| !event.is_finished);

        Ok(sorted_events(joined)
            .into_iter()
            .map(|event| JoinedEvent {
                title: event.title.clone(),
                city: event.city.clone(),
                date: event.date,
            })
            .collect())
    }
}
