/// Application name
pub const APP_NAME: &str = "Cove";

/// Top-level collection of spaces (communities)
pub const SPACES: &str = "spaces";

/// Sub-collection of channels under a space
pub const CHANNELS: &str = "channels";

/// Sub-collection of messages under a channel or a direct chat
pub const MESSAGES: &str = "messages";

/// Top-level collection of direct chats
pub const CHATS: &str = "chats";

/// Top-level collection of user profiles, keyed by user id
pub const USER_DETAILS: &str = "userDetails";

/// Top-level collection of short videos
pub const REELS: &str = "reels";

/// Object storage prefixes
pub const SPACE_ICONS_PREFIX: &str = "spaceIcons";
pub const PROFILE_PICTURES_PREFIX: &str = "profilePictures";
pub const REELS_PREFIX: &str = "reels";

/// Id of the channel created alongside every new space
pub const DEFAULT_CHANNEL_ID: &str = "introduction";
pub const DEFAULT_CHANNEL_NAME: &str = "Introduction";
pub const DEFAULT_CHANNEL_DESCRIPTION: &str = "This is the introduction channel.";

/// Shown when a channel document cannot be found
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown Channel";

/// Default for missing sender names / ids on message documents
pub const UNKNOWN: &str = "Unknown";

/// Language code used when detection fails
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Description written on reels uploaded without one
pub const DEFAULT_REEL_DESCRIPTION: &str = "Lorem ipsum dolor sit amet.";

/// Upper bound of a display-name prefix search (private-use codepoint)
pub const PREFIX_SEARCH_SENTINEL: char = '\u{f8ff}';

/// Chat-completions model used for translation and detection
pub const LANGUAGE_MODEL: &str = "llama3-8b-8192";

/// Output token budgets
pub const TRANSLATE_MAX_TOKENS: u32 = 1024;
pub const DETECT_MAX_TOKENS: u32 = 5;

/// Maximum upload size accepted by object storage (50 MiB)
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;
