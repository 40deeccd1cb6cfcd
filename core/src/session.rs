// Auth session — the signed-in user, kept between runs
//
// Authentication itself happens elsewhere; this only remembers who signed in.

use crate::store::{LocalStore, StorageBackend};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub const AUTH_SESSION_KEY: &str = "myatri:auth-user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Passenger,
    Driver,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Passenger => f.write_str("passenger"),
            UserRole::Driver => f.write_str("driver"),
            UserRole::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passenger" => Ok(UserRole::Passenger),
            "driver" => Ok(UserRole::Driver),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Clone)]
pub struct AuthSession {
    local: LocalStore,
}

impl AuthSession {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            local: LocalStore::new("session", backend),
        }
    }

    pub fn detached() -> Self {
        Self {
            local: LocalStore::detached("session"),
        }
    }

    pub fn set_user(&self, user: &AuthSessionUser) {
        self.local.write(AUTH_SESSION_KEY, user);
        info!(user_id = %user.id, role = %user.role, "Signed in");
    }

    pub fn user(&self) -> Option<AuthSessionUser> {
        self.local.read(AUTH_SESSION_KEY, None)
    }

    pub fn clear(&self) {
        self.local.remove(AUTH_SESSION_KEY);
    }

    pub fn flush(&self) {
        self.local.flush();
    }
}
