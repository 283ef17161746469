// Command handlers module
pub mod config;
pub mod monitor;
pub mod status;
pub mod version;

// Re-exports for cleaner imports
pub use monitor::execute as monitor;
pub use self_test::execute as self_test;
pub use status::execute as status;
pub use version::execute as version;
