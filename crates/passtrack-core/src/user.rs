//! Bot user record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Telegram user tracked by the bot. `id` is the Telegram user id as a
/// string; it doubles as the chat id for direct messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    /// Set when the user has blocked the bot; their orders are retired and
    /// no further messages are attempted.
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: &str, first_name: &str, last_name: &str, user_name: &str) -> Self {
        Self {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            user_name: if user_name.is_empty() {
                String::new()
            } else {
                format!("@{}", user_name.trim_start_matches('@'))
            },
            is_blocked: false,
            created_at: Utc::now(),
        }
    }

    /// Preferred display handle: @username when known, otherwise the name.
    pub fn display_name(&self) -> String {
        if !self.user_name.is_empty() {
            self.user_name.clone()
        } else if !self.last_name.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
        } else {
            self.first_name.clone()
        }
    }
}
