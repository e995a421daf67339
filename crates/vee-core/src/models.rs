//! # Domain Models
//!
//! These structs mirror the records kept by the remote record store.
//! Field names follow the store's wire format; expanded relations live
//! under `expand`, exactly as the store returns them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Collection names used by the store.
pub mod collections {
    pub const USERS: &str = "users";
    pub const COMMUNITIES: &str = "communities";
    pub const POSTS: &str = "posts";
    pub const INTERACTIONS: &str = "interactions";
    pub const COMMENTS: &str = "comments";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// A typed record living in one store collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
}

/// A member of the network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Lowercase handle, unique (e.g. "ada_l")
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    /// Ids of the users this user follows
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, with = "wire::timestamp")]
    pub created: Option<DateTime<Utc>>,
}

impl User {
    /// Full name, or the placeholder shown for users who never set one.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            "No Name"
        } else {
            &self.full_name
        }
    }

    pub fn handle(&self) -> String {
        format!("@{}", self.username)
    }

    pub fn follows(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }
}

/// A topic group posts can be published into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Rules in the same inline markup posts use
    #[serde(default)]
    pub rules: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default, with = "wire::timestamp")]
    pub created: Option<DateTime<Utc>>,
}

impl Community {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|id| id == user_id)
    }
}

/// The fundamental unit of conversation.
///
/// A post with `original_post` set is a *repost*: its own `content` is the
/// comment attached by the reposting user (possibly empty), never the
/// original's text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, with = "wire::relation")]
    pub community: Option<String>,
    #[serde(default, with = "wire::relation")]
    pub original_post: Option<String>,
    #[serde(default, with = "wire::timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "PostExpand::is_empty")]
    pub expand: PostExpand,
}

/// Relations of a post the store was asked to expand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostExpand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_post: Option<Box<Post>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<Community>,
}

impl PostExpand {
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.original_post.is_none() && self.community.is_none()
    }
}

impl Post {
    pub fn is_repost(&self) -> bool {
        self.original_post.is_some()
    }

    /// The expanded author, if the store supplied it.
    pub fn author_record(&self) -> Option<&User> {
        self.expand.author.as_ref()
    }

    /// The expanded original of a repost. `None` for plain posts and for
    /// reposts whose relation was not expanded.
    pub fn original(&self) -> Option<&Post> {
        self.original_post.as_ref()?;
        self.expand.original_post.as_deref()
    }
}

/// Kind of a user-to-post join record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Repost,
    Bookmark,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Repost => "repost",
            Self::Bookmark => "bookmark",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most one per (user, post, kind); the store enforces uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub user: String,
    pub post: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub user: String,
    pub post: String,
    pub content: String,
    #[serde(default, with = "wire::relation")]
    pub parent_comment: Option<String>,
    #[serde(default, with = "wire::timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "CommentExpand::is_empty")]
    pub expand: CommentExpand,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentExpand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl CommentExpand {
    pub fn is_empty(&self) -> bool {
        self.user.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Mention,
    Like,
    Comment,
    Repost,
    Follow,
    CommunityJoin,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Repost => "repost",
            Self::Follow => "follow",
            Self::CommunityJoin => "community_join",
        }
    }
}

/// Created only as a side effect of another user's interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub user: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub source_user: String,
    #[serde(default, with = "wire::relation")]
    pub post: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, with = "wire::timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "NotificationExpand::is_empty")]
    pub expand: NotificationExpand,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationExpand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
}

impl NotificationExpand {
    pub fn is_empty(&self) -> bool {
        self.source_user.is_none() && self.post.is_none()
    }
}

macro_rules! impl_record {
    ($($ty:ty => $collection:expr),* $(,)?) => {
        $(
            impl Record for $ty {
                const COLLECTION: &'static str = $collection;
            }
        )*
    };
}

impl_record! {
    User => collections::USERS,
    Community => collections::COMMUNITIES,
    Post => collections::POSTS,
    Interaction => collections::INTERACTIONS,
    Comment => collections::COMMENTS,
    Notification => collections::NOTIFICATIONS,
}

/// Parses either RFC 3339 or the store's `YYYY-MM-DD HH:MM:SS.sssZ` form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(&raw.replacen(' ', "T", 1)))
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Serde adapters for the store's wire quirks.
mod wire {
    /// Single relations: the store sends `""` for "no relation".
    pub mod relation {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(value.as_deref().unwrap_or_default())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            Ok(raw.filter(|id| !id.is_empty()))
        }
    }

    pub mod timestamp {
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::de::Error;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(ts) => s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
                None => s.serialize_str(""),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            match raw.as_deref() {
                None | Some("") => Ok(None),
                Some(raw) => super::super::parse_timestamp(raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp {raw:?}"))),
            }
        }
    }
}
