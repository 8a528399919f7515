pub mod runtime;

pub use protocol::models;
pub use protocol::{AppError, AppResult, ResultExt};
pub use runtime::blocking::run_blocking;
