pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, LogFormat};

pub use crate::config::RelayConfig;
pub use crate::core::{engine::GenerateEngine, moderation::Denylist, openrouter::OpenRouterClient};
pub use crate::server::{app_router, AppState};
pub use crate::utils::error::{RelayError, Result};
