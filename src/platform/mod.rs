// Platform-specific code module

pub mod mdraid;
pub mod notify;
pub mod smartctl;
pub mod storage_backend;

// Re-exports for clean imports
pub use notify::DesktopNotifier;
pub use storage_backend::SystemBackend;
