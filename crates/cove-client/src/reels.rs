//! Short video posts.

use chrono::Utc;
use rand::Rng;
use tracing::info;

use cove_shared::constants::{DEFAULT_REEL_DESCRIPTION, REELS, REELS_PREFIX};
use cove_shared::models::Reel;
use cove_shared::query::{CollectionPath, Query};
use cove_shared::time::now_iso;
use cove_shared::types::UserId;
use cove_shared::{CoveError, Result};

use crate::context::{upload_and_resolve, ClientContext, Upload};
use crate::live::decode_all;

const SUFFIX_LEN: usize = 7;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `reels/{epoch millis}-{7 random base-36 chars}`
fn reel_path() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{REELS_PREFIX}/{}-{suffix}", Utc::now().timestamp_millis())
}

/// Upload a video for the signed-in user and publish it as a reel.
pub async fn upload_reel(
    ctx: &ClientContext,
    video: Upload,
    description: Option<&str>,
) -> Result<Reel> {
    let user = ctx.require_user()?;
    if video.data.is_empty() {
        return Err(CoveError::validation("video is empty"));
    }

    let path = reel_path();
    let video_url = upload_and_resolve(ctx, &path, video).await?;

    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_REEL_DESCRIPTION);

    let mut reel = Reel {
        id: String::new(),
        video_url,
        user,
        description: description.to_string(),
        likes: "0".into(),
        comments: "0".into(),
        shares: "0".into(),
        created_at: Some(now_iso()),
    };
    reel.id = ctx
        .store
        .add(&CollectionPath::root(REELS), reel.to_fields())
        .await?;

    info!(reel = %reel.id, path = %path, "reel uploaded");
    Ok(reel)
}

pub async fn list_user_reels(ctx: &ClientContext, user: &UserId) -> Result<Vec<Reel>> {
    let query = Query::new(CollectionPath::root(REELS)).where_eq("user", user.as_str());
    let docs = ctx.store.query(&query).await?;
    Ok(decode_all(&docs, Reel::from_document))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::testing::TestBackend;

    use super::*;

    #[test]
    fn path_shape() {
        let path = reel_path();
        let name = path.strip_prefix("reels/").unwrap();
        let (millis, suffix) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 1_600_000_000_000);
        assert_eq!(suffix.len(), 7);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
    }

    #[tokio::test]
    async fn upload_and_list() {
        let backend = TestBackend::new();
        backend.auth.sign_in("u1");
        let ctx = backend.context();

        let reel = upload_reel(&ctx, Upload::new(&b"mp4"[..], "video/mp4"), None)
            .await
            .unwrap();
        assert_eq!(reel.description, "Lorem ipsum dolor sit amet.");
        assert_eq!(reel.likes, "0");
        assert!(reel.video_url.starts_with("mem://reels/"));

        upload_reel(&ctx, Upload::new(&b"mp4"[..], "video/mp4"), Some("sunset"))
            .await
            .unwrap();
        backend.auth.sign_in("u2");
        upload_reel(&ctx, Upload::new(&b"mp4"[..], "video/mp4"), None)
            .await
            .unwrap();

        let mine = list_user_reels(&ctx, &UserId::from("u1")).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0], reel);
        assert_eq!(mine[1].description, "sunset");
    }

    #[tokio::test]
    async fn empty_video_rejected() {
        let backend = TestBackend::new();
        let ctx = backend.context();
        let empty = || Upload::new(Bytes::new(), "video/mp4");

        assert_eq!(upload_reel(&ctx, empty(), None).await.unwrap_err(), CoveError::AuthRequired);
        backend.auth.sign_in("u1");
        assert!(matches!(
            upload_reel(&ctx, empty(), None).await.unwrap_err(),
            CoveError::Validation(_)
        ));
        assert!(backend.objects.paths().is_empty());
    }
}
