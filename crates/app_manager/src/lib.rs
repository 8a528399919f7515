pub mod app_manager;
pub mod config;
mod naming;

pub use app_manager::*;
pub use config::{EngineConfig, RootPaths};

pub use protocol::models;
pub use protocol::{AppError, AppResult, ResultExt};
