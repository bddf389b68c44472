//! Gitter domain records carried by the message stream.
//!
//! Field names follow the Gitter JSON schema (camelCase on the wire). Every
//! field is optional on input: the stream only guarantees `id`, and a record
//! missing the rest still decodes with empty defaults.

use serde::{Deserialize, Serialize};

/// A chat message posted in a room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    /// Message id
    pub id: String,
    /// Original message in plain text or markdown
    pub text: String,
    /// HTML formatted message
    pub html: String,
    /// ISO-8601 timestamp of when the message was sent
    pub sent: String,
    /// ISO-8601 timestamp of the last edit, if edited
    pub edited_at: Option<String>,
    /// Sender of the message
    pub from_user: User,
    /// Whether the message is still unread for the current user
    pub unread: bool,
    /// Number of users that have read the message
    pub read_by: u32,
    /// URLs present in the message
    pub urls: Vec<MessageUrl>,
    /// Users mentioned in the message
    pub mentions: Vec<Mention>,
    /// Issues referenced in the message
    pub issues: Vec<Issue>,
    /// Version
    #[serde(rename = "v")]
    pub version: u32,
}

/// A Gitter user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// Gitter user id
    pub id: String,
    /// Gitter/GitHub username
    pub username: String,
    /// Display name, usually the full name
    pub display_name: String,
    /// Path to the user on Gitter
    pub url: String,
    /// Small avatar URL
    pub avatar_url_small: String,
    /// Medium avatar URL
    pub avatar_url_medium: String,
}

/// A URL found in a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageUrl {
    /// The URL
    pub url: String,
}

/// A user mention inside a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mention {
    /// Screen name as written in the message
    pub screen_name: String,
    /// Mentioned user id, absent when the name did not resolve
    pub user_id: Option<String>,
}

/// An issue reference inside a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    /// Issue number
    pub number: String,
}
