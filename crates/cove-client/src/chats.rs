//! One-to-one chats.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info};

use cove_shared::constants::CHATS;
use cove_shared::models::{DirectChat, UserProfile};
use cove_shared::query::{CollectionPath, Query};
use cove_shared::types::{ChatId, UserId};
use cove_shared::{CoveError, Result};

use crate::context::ClientContext;
use crate::live::decode_all;
use crate::profile::get_profile;

/// A chat in the signed-in user's chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub chat: DirectChat,
    pub other: Option<UserId>,
    /// `None` when the other user has no readable profile.
    pub other_profile: Option<UserProfile>,
}

/// Open (creating if needed) the chat between the signed-in user and
/// `friend`. Either side starting the chat gets the same id.
pub async fn start_chat(ctx: &ClientContext, friend: &UserId) -> Result<ChatId> {
    let me = ctx.require_user()?;
    if friend.as_str().trim().is_empty() {
        return Err(CoveError::validation("friend id is empty"));
    }
    if *friend == me {
        return Err(CoveError::validation("cannot start a chat with yourself"));
    }

    let id = ChatId::between(&me, friend);
    let chats = CollectionPath::root(CHATS);

    if ctx.store.get(&chats, id.as_str()).await?.is_some() {
        debug!(chat = %id, "chat already exists");
        return Ok(id);
    }

    ctx.store
        .set(
            &chats,
            id.as_str(),
            DirectChat::creation_fields(&[me, friend.clone()]),
            false,
        )
        .await?;
    info!(chat = %id, "chat created");
    Ok(id)
}

/// Chats the signed-in user takes part in, with the other participant's
/// profile resolved best-effort.
pub async fn list_chats(ctx: &ClientContext) -> Result<Vec<ChatSummary>> {
    let me = ctx.require_user()?;
    let docs = ctx
        .store
        .query(&Query::new(CollectionPath::root(CHATS)).array_contains("participants", me.as_str()))
        .await?;
    let chats = decode_all(&docs, DirectChat::from_document);

    let lookups = chats.iter().map(|chat| {
        let other = chat.other_participant(&me).cloned();
        async move {
            match &other {
                Some(user) => get_profile(ctx, user).await.ok(),
                None => None,
            }
        }
    });
    let profiles = join_all(lookups).await;

    Ok(chats
        .into_iter()
        .zip(profiles)
        .map(|(chat, other_profile)| ChatSummary {
            other: chat.other_participant(&me).cloned(),
            chat,
            other_profile,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::testing::TestBackend;

    use super::*;

    #[tokio::test]
    async fn either_side_resolves_to_same_chat() {
        let backend = TestBackend::new();
        let ctx = backend.context();

        backend.auth.sign_in("bob");
        let from_bob = start_chat(&ctx, &UserId::from("alice")).await.unwrap();

        backend.auth.sign_in("alice");
        let from_alice = start_chat(&ctx, &UserId::from("bob")).await.unwrap();

        assert_eq!(from_bob, from_alice);
        assert_eq!(from_alice.as_str(), "alice_bob");

        let all = backend
            .store
            .inner
            .list_collection(&CollectionPath::root(CHATS))
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].data["participants"], serde_json::json!(["bob", "alice"]));
        assert_eq!(all[0].data["messages"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn start_chat_validation() {
        let backend = TestBackend::new();
        let ctx = backend.context();
        assert_eq!(
            start_chat(&ctx, &UserId::from("b")).await.unwrap_err(),
            CoveError::AuthRequired
        );

        backend.auth.sign_in("a");
        assert!(matches!(
            start_chat(&ctx, &UserId::from("a")).await.unwrap_err(),
            CoveError::Validation(_)
        ));
        assert!(matches!(
            start_chat(&ctx, &UserId::from(" ")).await.unwrap_err(),
            CoveError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn list_resolves_other_participant() {
        let backend = TestBackend::new();
        backend.seed_profile("bob", "Bob", None);
        backend.store.fail_profile("carol");
        let ctx = backend.context();

        backend.auth.sign_in("alice");
        start_chat(&ctx, &UserId::from("bob")).await.unwrap();
        start_chat(&ctx, &UserId::from("carol")).await.unwrap();
        backend.auth.sign_in("dave");
        start_chat(&ctx, &UserId::from("erin")).await.unwrap();

        backend.auth.sign_in("alice");
        let chats = list_chats(&ctx).await.unwrap();
        assert_eq!(chats.len(), 2);

        let bob = chats.iter().find(|c| c.chat.id.as_str() == "alice_bob").unwrap();
        assert_eq!(bob.other, Some(UserId::from("bob")));
        assert_eq!(bob.other_profile.as_ref().unwrap().display_name, "Bob");

        let carol = chats.iter().find(|c| c.chat.id.as_str() == "alice_carol").unwrap();
        assert!(carol.other_profile.is_none());
    }
}
