pub mod auth;
pub mod chats;
pub mod config;
pub mod context;
pub mod live;
pub mod profile;
pub mod reels;
pub mod spaces;
pub mod stream;
pub mod translation;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use auth::SessionAuth;
pub use config::ClientConfig;
pub use context::{ClientContext, Upload};
pub use stream::{ConversationView, MessageView, StreamSnapshot};
pub use translation::TranslationOverlay;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("cove_client=debug,cove_store=info,cove_lang=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting Cove client core");
    }
}
