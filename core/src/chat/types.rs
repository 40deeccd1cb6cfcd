use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    Passenger,
    Driver,
}

impl fmt::Display for ChatSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatSender::Passenger => f.write_str("passenger"),
            ChatSender::Driver => f.write_str("driver"),
        }
    }
}

impl FromStr for ChatSender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passenger" => Ok(ChatSender::Passenger),
            "driver" => Ok(ChatSender::Driver),
            other => Err(format!("unknown chat sender: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub driver_id: String,
    pub driver_name: String,
    pub sender: ChatSender,
    pub text: String,
    pub timestamp: String,
}

/// Append-only conversation between the passenger and one driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    pub driver_id: String,
    pub driver_name: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatThread {
    pub fn empty(driver_id: &str, driver_name: &str) -> Self {
        Self {
            driver_id: driver_id.to_string(),
            driver_name: driver_name.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Arguments of [`crate::chat::ChatStore::send_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub driver_id: String,
    pub driver_name: String,
    pub sender: ChatSender,
    pub text: String,
}
