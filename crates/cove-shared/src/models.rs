//! Typed records decoded from backend documents.
//!
//! Decoding happens once, at the boundary. Missing fields fall back to the
//! defaults documented on each struct; a field holding the wrong JSON type
//! is a [`CoveError::Malformed`].

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::constants::UNKNOWN;
use crate::error::{CoveError, Result};
use crate::query::Document;
use crate::time::{format_minute, millis_to_iso};
use crate::types::{ChannelId, ChatId, MessageId, SpaceId, UserId};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat message in a channel or direct chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    /// Sender display name. Default `Unknown`.
    pub name: String,
    /// Sender id. Default `Unknown`.
    pub user_id: UserId,
    /// Message body, stored under `lastMessage`. Default empty.
    pub body: String,
    /// Sender avatar URL, filled in by enrichment.
    pub profile_picture: Option<String>,
    /// ISO-8601. Epoch-millisecond numbers are normalized. Default empty.
    pub timestamp: String,
    /// `YYYY-MM-DD HH:MM`. Derived from `timestamp` when absent.
    pub formatted_timestamp: String,
}

impl Message {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let timestamp = timestamp_field(doc, "timestamp")?.unwrap_or_default();
        let formatted_timestamp = match opt_string(doc, "formattimestamp")? {
            Some(f) => f,
            None if !timestamp.is_empty() => format_minute(&timestamp),
            None => String::new(),
        };

        Ok(Self {
            id: MessageId::new(doc.id.clone()),
            name: opt_string(doc, "name")?.unwrap_or_else(|| UNKNOWN.to_string()),
            user_id: UserId::new(opt_string(doc, "userId")?.unwrap_or_else(|| UNKNOWN.to_string())),
            body: opt_string(doc, "lastMessage")?.unwrap_or_default(),
            profile_picture: opt_string(doc, "profilePicture")?,
            timestamp,
            formatted_timestamp,
        })
    }

    /// Fields written when the message is created.
    pub fn to_fields(&self) -> Map<String, Value> {
        object(json!({
            "name": self.name,
            "userId": self.user_id,
            "lastMessage": self.body,
            "profilePicture": self.profile_picture,
            "timestamp": self.timestamp,
            "formattimestamp": self.formatted_timestamp,
        }))
    }
}

// ---------------------------------------------------------------------------
// Direct chat
// ---------------------------------------------------------------------------

/// A one-to-one conversation, stored at `chats/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectChat {
    pub id: ChatId,
    /// Default empty.
    pub participants: Vec<UserId>,
    pub last_message: Option<String>,
}

impl DirectChat {
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: ChatId::new(doc.id.clone()),
            participants: string_array(doc, "participants")?
                .into_iter()
                .map(UserId::new)
                .collect(),
            last_message: opt_string(doc, "lastMessage")?,
        })
    }

    /// Fields written when the chat is first created. `messages` is kept as
    /// an empty array for older clients that expect it.
    pub fn creation_fields(participants: &[UserId]) -> Map<String, Value> {
        object(json!({
            "participants": participants,
            "messages": [],
        }))
    }

    /// The participant that is not `me`.
    pub fn other_participant(&self, me: &UserId) -> Option<&UserId> {
        self.participants.iter().find(|p| *p != me)
    }
}

// ---------------------------------------------------------------------------
// Space / channel
// ---------------------------------------------------------------------------

/// A community grouping channels and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: SpaceId,
    /// Default empty.
    pub name: String,
    /// Default empty.
    pub description: String,
    pub icon: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: Option<String>,
    /// Default empty.
    pub members: Vec<UserId>,
}

impl Space {
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: SpaceId::new(doc.id.clone()),
            name: opt_string(doc, "name")?.unwrap_or_default(),
            description: opt_string(doc, "description")?.unwrap_or_default(),
            icon: opt_string(doc, "icon")?,
            created_by: opt_string(doc, "createdBy")?.map(UserId::new),
            created_at: timestamp_field(doc, "createdAt")?,
            members: string_array(doc, "members")?
                .into_iter()
                .map(UserId::new)
                .collect(),
        })
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        object(json!({
            "name": self.name,
            "description": self.description,
            "icon": self.icon,
            "createdBy": self.created_by,
            "createdAt": self.created_at,
            "members": self.members,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    /// Default empty.
    pub name: String,
    /// Default empty.
    pub description: String,
    pub icon: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: Option<String>,
}

impl Channel {
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: ChannelId::new(doc.id.clone()),
            name: opt_string(doc, "name")?.unwrap_or_default(),
            description: opt_string(doc, "description")?.unwrap_or_default(),
            icon: opt_string(doc, "icon")?,
            created_by: opt_string(doc, "createdBy")?.map(UserId::new),
            created_at: timestamp_field(doc, "createdAt")?,
        })
    }

    /// Channels added after space creation carry no `createdBy`/`createdAt`,
    /// so those keys are only written when set.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = object(json!({
            "name": self.name,
            "description": self.description,
            "icon": self.icon,
        }));
        if let Some(by) = &self.created_by {
            fields.insert("createdBy".into(), json!(by));
        }
        if let Some(at) = &self.created_at {
            fields.insert("createdAt".into(), json!(at));
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// Profile stored at `userDetails/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    /// Default empty.
    pub username: String,
    /// Default empty.
    pub display_name: String,
    pub dob: Option<String>,
    pub created_at: Option<String>,
    pub profile_picture: Option<String>,
}

impl UserProfile {
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: UserId::new(doc.id.clone()),
            username: opt_string(doc, "username")?.unwrap_or_default(),
            display_name: opt_string(doc, "displayName")?.unwrap_or_default(),
            dob: timestamp_field(doc, "dob")?,
            created_at: timestamp_field(doc, "createdAt")?,
            profile_picture: opt_string(doc, "profilePicture")?,
        })
    }

    /// Sign-up fields. `profilePicture` is set separately, by merge.
    pub fn details_fields(&self) -> Map<String, Value> {
        object(json!({
            "username": self.username,
            "displayName": self.display_name,
            "dob": self.dob,
            "createdAt": self.created_at,
        }))
    }
}

// ---------------------------------------------------------------------------
// Reel
// ---------------------------------------------------------------------------

/// A short video post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reel {
    pub id: String,
    /// Default empty.
    pub video_url: String,
    /// Uploader. Default `Unknown`.
    pub user: UserId,
    /// Default empty.
    pub description: String,
    /// Counters are stored as strings. Default `"0"`.
    pub likes: String,
    pub comments: String,
    pub shares: String,
    pub created_at: Option<String>,
}

impl Reel {
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: doc.id.clone(),
            video_url: opt_string(doc, "videoUrl")?.unwrap_or_default(),
            user: UserId::new(opt_string(doc, "user")?.unwrap_or_else(|| UNKNOWN.to_string())),
            description: opt_string(doc, "description")?.unwrap_or_default(),
            likes: counter(doc, "likes")?,
            comments: counter(doc, "comments")?,
            shares: counter(doc, "shares")?,
            created_at: timestamp_field(doc, "createdAt")?,
        })
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        object(json!({
            "videoUrl": self.video_url,
            "user": self.user,
            "description": self.description,
            "likes": self.likes,
            "comments": self.comments,
            "shares": self.shares,
            "createdAt": self.created_at,
        }))
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn wrong_type(doc: &Document, field: &str, expected: &str) -> CoveError {
    CoveError::malformed(format!(
        "document {}: field `{field}` is not {expected}",
        doc.id
    ))
}

/// Missing or null -> `None`; a string -> `Some`; anything else is malformed.
fn opt_string(doc: &Document, field: &str) -> Result<Option<String>> {
    match doc.field(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(wrong_type(doc, field, "a string")),
    }
}

fn string_array(doc: &Document, field: &str) -> Result<Vec<String>> {
    match doc.field(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(wrong_type(doc, field, "an array of strings")),
            })
            .collect(),
        Some(_) => Err(wrong_type(doc, field, "an array")),
    }
}

/// ISO string, or epoch milliseconds normalized to ISO.
fn timestamp_field(doc: &Document, field: &str) -> Result<Option<String>> {
    match doc.field(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(millis_to_iso)
            .map(Some)
            .ok_or_else(|| wrong_type(doc, field, "a timestamp")),
        Some(_) => Err(wrong_type(doc, field, "a timestamp")),
    }
}

fn counter(doc: &Document, field: &str) -> Result<String> {
    match doc.field(field) {
        None | Some(Value::Null) => Ok("0".to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(wrong_type(doc, field, "a counter")),
    }
}
