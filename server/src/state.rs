use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::JwtKeys;
use crate::db::Database;

/// Shared by every request. Holds no mutable state of its own.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(db: Database, jwt_secret: &str) -> Self {
        Self {
            db,
            jwt: Arc::new(JwtKeys::new(jwt_secret.as_bytes())),
        }
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
