// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub type UserId = i64;

/// A user as the backend embeds it in posts, comments and friend requests.
/// Every profile field except `id` may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,

    /// URL of the avatar image.
    #[serde(default)]
    pub avatar: Option<String>,

    /// Short tagline shown under the name (e.g. "Product Designer at X").
    #[serde(default)]
    pub headline: Option<String>,

    #[serde(default)]
    pub location: Option<String>,
}

impl User {
    /// Minimal reference carrying only the id and username.
    pub fn reference(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            name: None,
            first_name: None,
            last_name: None,
            avatar: None,
            headline: None,
            location: None,
        }
    }

    /// Name to render: `name`, then "first last", then the username.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// DTO for user login.
#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Token pair returned by `POST /auth/jwt/create/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
