//! API request handlers

pub mod accounts;
pub mod attempts;
pub mod contacts;
pub mod health;
pub mod mailings;
pub mod messages;
pub mod recipients;
pub mod stats;
pub mod users;

pub use health::*;

use serde::{Deserialize, Serialize};

/// Plain text acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
