//! Spaces and their channels.

use serde_json::{json, Map};
use tracing::info;

use cove_shared::constants::{
    CHANNELS, DEFAULT_CHANNEL_DESCRIPTION, DEFAULT_CHANNEL_ID, DEFAULT_CHANNEL_NAME,
    SPACES, SPACE_ICONS_PREFIX, UNKNOWN_CHANNEL_NAME,
};
use cove_shared::models::{Channel, Space};
use cove_shared::query::{CollectionPath, Query};
use cove_shared::time::now_iso;
use cove_shared::types::{ChannelId, SpaceId, UserId};
use cove_shared::{CoveError, Result};

use crate::context::{upload_and_resolve, ClientContext, Upload};
use crate::live::Live;

fn spaces() -> CollectionPath {
    CollectionPath::root(SPACES)
}

fn channels(space: &SpaceId) -> CollectionPath {
    spaces().doc(space.as_str()).collection(CHANNELS)
}

/// Create a space owned by the signed-in user, with its introduction
/// channel.
pub async fn create_space(
    ctx: &ClientContext,
    name: &str,
    description: &str,
    icon: Option<Upload>,
) -> Result<Space> {
    let user = ctx.require_user()?;
    if name.trim().is_empty() {
        return Err(CoveError::validation("space name is required"));
    }

    let created_at = now_iso();
    let icon = match icon {
        Some(upload) => {
            let path = format!("{SPACE_ICONS_PREFIX}/{created_at}");
            Some(upload_and_resolve(ctx, &path, upload).await?)
        }
        None => None,
    };

    let mut space = Space {
        id: SpaceId::new(String::new()),
        name: name.trim().to_string(),
        description: description.to_string(),
        icon,
        created_by: Some(user.clone()),
        created_at: Some(created_at.clone()),
        members: vec![user.clone()],
    };
    space.id = SpaceId::new(ctx.store.add(&spaces(), space.to_fields()).await?);

    let intro = Channel {
        id: ChannelId::from(DEFAULT_CHANNEL_ID),
        name: DEFAULT_CHANNEL_NAME.to_string(),
        description: DEFAULT_CHANNEL_DESCRIPTION.to_string(),
        icon: None,
        created_by: Some(user),
        created_at: Some(created_at),
    };
    ctx.store
        .set(&channels(&space.id), intro.id.as_str(), intro.to_fields(), false)
        .await?;

    info!(space = %space.id, name = %space.name, "space created");
    Ok(space)
}

/// Live list of spaces the signed-in user belongs to.
pub async fn watch_spaces(ctx: &ClientContext) -> Result<Live<Space>> {
    let user = ctx.require_user()?;
    let query = Query::new(spaces()).array_contains("members", user.as_str());
    Ok(Live::new(ctx.store.watch(query).await?, Space::from_document))
}

pub async fn get_space(ctx: &ClientContext, space: &SpaceId) -> Result<Space> {
    let doc = ctx
        .store
        .get(&spaces(), space.as_str())
        .await?
        .ok_or_else(|| CoveError::not_found(format!("space {space}")))?;
    Space::from_document(&doc)
}

pub async fn add_channel(
    ctx: &ClientContext,
    space: &SpaceId,
    name: &str,
    description: &str,
) -> Result<ChannelId> {
    if name.trim().is_empty() {
        return Err(CoveError::validation("channel name is required"));
    }
    get_space(ctx, space).await?;

    let channel = Channel {
        id: ChannelId::new(String::new()),
        name: name.trim().to_string(),
        description: description.to_string(),
        icon: None,
        created_by: None,
        created_at: None,
    };
    let id = ChannelId::new(ctx.store.add(&channels(space), channel.to_fields()).await?);
    info!(space = %space, channel = %id, "channel added");
    Ok(id)
}

pub async fn watch_channels(ctx: &ClientContext, space: &SpaceId) -> Result<Live<Channel>> {
    let query = Query::new(channels(space));
    Ok(Live::new(ctx.store.watch(query).await?, Channel::from_document))
}

/// Display name of a channel, `Unknown Channel` when it does not exist.
pub async fn channel_name(ctx: &ClientContext, space: &SpaceId, channel: &ChannelId) -> Result<String> {
    let name = match ctx.store.get(&channels(space), channel.as_str()).await? {
        Some(doc) => Channel::from_document(&doc)?.name,
        None => UNKNOWN_CHANNEL_NAME.to_string(),
    };
    Ok(name)
}

/// Add `user` to a space. Returns `false` if they were already a member.
pub async fn add_member(ctx: &ClientContext, space: &SpaceId, user: &UserId) -> Result<bool> {
    let mut current = get_space(ctx, space).await?;
    if current.members.contains(user) {
        return Ok(false);
    }
    current.members.push(user.clone());

    let mut fields = Map::new();
    fields.insert("members".into(), json!(current.members));
    ctx.store.update(&spaces(), space.as_str(), fields).await?;

    info!(space = %space, user = %user, "member added");
    Ok(true)
}
