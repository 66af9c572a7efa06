//! User profiles (`userDetails/{uid}`).

use serde_json::{Map, Value};
use tracing::info;

use cove_shared::constants::{PREFIX_SEARCH_SENTINEL, PROFILE_PICTURES_PREFIX, USER_DETAILS};
use cove_shared::models::UserProfile;
use cove_shared::query::{CollectionPath, Direction, Query};
use cove_shared::time::now_iso;
use cove_shared::types::UserId;
use cove_shared::{CoveError, Result};

use crate::context::{upload_and_resolve, ClientContext, Upload};
use crate::live::decode_all;

fn details() -> CollectionPath {
    CollectionPath::root(USER_DETAILS)
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoveError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Complete sign-up for the signed-in user. Every field is required.
pub async fn create_user_details(
    ctx: &ClientContext,
    username: &str,
    display_name: &str,
    dob: &str,
) -> Result<UserProfile> {
    let user = ctx.require_user()?;
    require("username", username)?;
    require("display name", display_name)?;
    require("date of birth", dob)?;

    let profile = UserProfile {
        id: user,
        username: username.trim().to_string(),
        display_name: display_name.trim().to_string(),
        dob: Some(dob.trim().to_string()),
        created_at: Some(now_iso()),
        profile_picture: None,
    };

    // Merge so a picture uploaded before sign-up finished survives.
    ctx.store
        .set(&details(), profile.id.as_str(), profile.details_fields(), true)
        .await?;
    info!(user = %profile.id, "user details saved");

    get_profile(ctx, &profile.id).await
}

/// Upload a new avatar for the signed-in user and return its URL.
pub async fn set_profile_picture(ctx: &ClientContext, image: Upload) -> Result<String> {
    let user = ctx.require_user()?;
    let path = format!("{PROFILE_PICTURES_PREFIX}/{user}");
    let url = upload_and_resolve(ctx, &path, image).await?;

    let mut fields = Map::new();
    fields.insert("profilePicture".into(), Value::String(url.clone()));
    ctx.store.set(&details(), user.as_str(), fields, true).await?;

    info!(user = %user, "profile picture updated");
    Ok(url)
}

pub async fn get_profile(ctx: &ClientContext, user: &UserId) -> Result<UserProfile> {
    let doc = ctx
        .store
        .get(&details(), user.as_str())
        .await?
        .ok_or_else(|| CoveError::not_found(format!("profile {user}")))?;
    UserProfile::from_document(&doc)
}

/// Profiles whose display name starts with `prefix`. An empty prefix
/// matches nobody.
pub async fn search_users(ctx: &ClientContext, prefix: &str) -> Result<Vec<UserProfile>> {
    if prefix.is_empty() {
        return Ok(Vec::new());
    }
    let upper = format!("{prefix}{PREFIX_SEARCH_SENTINEL}");
    let query = Query::new(details())
        .gte("displayName", prefix)
        .lte("displayName", upper)
        .order_by("displayName", Direction::Ascending);

    let docs = ctx.store.query(&query).await?;
    Ok(decode_all(&docs, UserProfile::from_document))
}
