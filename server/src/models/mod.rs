pub mod attendance;
pub mod event;
pub mod user;

pub use attendance::{AttendeeEntry, AttendeeProfile, Attendance, JoinedEvent};
pub use event::{Event, EventChanges, EventSummary, NewEvent};
pub use user::{NewUser, ProfileChanges, Role, User, UserProfile};

use crate::utils::error::AppError;

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!(
            "'{}' must not be empty",
            field
        )));
    }
    Ok(())
}
