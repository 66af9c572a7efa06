use serde::{Deserialize, Serialize};

use crate::constants::{CHANNELS, CHATS, MESSAGES, SPACES};
use crate::query::CollectionPath;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Auth-provider user id (opaque).
    UserId
);
string_id!(
    /// Backend-assigned space id.
    SpaceId
);
string_id!(
    /// Channel id, unique within its space.
    ChannelId
);
string_id!(
    /// Direct chat id: the two participant ids, sorted and joined with `_`.
    ChatId
);
string_id!(
    /// Backend-assigned message id.
    MessageId
);

impl ChatId {
    /// Derive the chat id for a pair of users.
    ///
    /// Argument order does not matter, so either participant starting the
    /// chat lands on the same document.
    pub fn between(a: &UserId, b: &UserId) -> Self {
        let mut pair = [a.as_str(), b.as_str()];
        pair.sort_unstable();
        Self(pair.join("_"))
    }
}

/// Identifies the message collection a view is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationKey {
    /// A channel inside a space.
    Channel { space: SpaceId, channel: ChannelId },
    /// A one-to-one chat.
    Direct(ChatId),
}

impl ConversationKey {
    pub fn channel(space: impl Into<SpaceId>, channel: impl Into<ChannelId>) -> Self {
        Self::Channel {
            space: space.into(),
            channel: channel.into(),
        }
    }

    pub fn direct(chat: impl Into<ChatId>) -> Self {
        Self::Direct(chat.into())
    }

    /// Collection holding this conversation's messages.
    pub fn messages_path(&self) -> CollectionPath {
        match self {
            Self::Channel { space, channel } => CollectionPath::root(SPACES)
                .doc(space.as_str())
                .collection(CHANNELS)
                .doc(channel.as_str())
                .collection(MESSAGES),
            Self::Direct(chat) => CollectionPath::root(CHATS)
                .doc(chat.as_str())
                .collection(MESSAGES),
        }
    }

    /// True when any path segment is empty (an unusable key).
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Channel { space, channel } => {
                space.as_str().trim().is_empty() || channel.as_str().trim().is_empty()
            }
            Self::Direct(chat) => chat.as_str().trim().is_empty(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel { space, channel } => write!(f, "{space}/{channel}"),
            Self::Direct(chat) => write!(f, "chat:{chat}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_is_order_independent() {
        let a = UserId::from("alice");
        let b = UserId::from("bob");
        assert_eq!(ChatId::between(&a, &b), ChatId::between(&b, &a));
        assert_eq!(ChatId::between(&b, &a).as_str(), "alice_bob");
    }

    #[test]
    fn chat_id_sorts_bytewise() {
        let upper = UserId::from("Zed");
        let lower = UserId::from("amy");
        // uppercase sorts before lowercase
        assert_eq!(ChatId::between(&lower, &upper).as_str(), "Zed_amy");
    }

    #[test]
    fn messages_paths() {
        let key = ConversationKey::channel("s1", "general");
        assert_eq!(
            key.messages_path().as_str(),
            "spaces/s1/channels/general/messages"
        );

        let key = ConversationKey::direct("a_b");
        assert_eq!(key.messages_path().as_str(), "chats/a_b/messages");
    }

    #[test]
    fn blank_keys() {
        assert!(ConversationKey::channel("", "c").is_blank());
        assert!(ConversationKey::direct("  ").is_blank());
        assert!(!ConversationKey::direct("a_b").is_blank());
    }
}
