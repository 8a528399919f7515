mod app;
mod commands;

pub use app::appscope_service::AppScopeService;
pub use app::report::{format_bytes, render_audit, render_disks, render_scan_table};
pub use appscope_app_manager::{
    AppScopeEngine, ApplicationDescriptor, EngineConfig, FsSizeMeasure, InstalledProgramSource,
    RootPaths, ScanState, SizeMeasure, StaticProgramSource,
};
pub use protocol::InvokeError;
pub use protocol::models;
