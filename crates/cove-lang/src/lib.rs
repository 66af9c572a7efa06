pub mod client;
pub mod config;
mod error;

pub use client::LanguageClient;
pub use config::LanguageConfig;
pub use error::LangError;
