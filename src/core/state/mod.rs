// Run-window state and watermark tracking

pub mod manager;
pub mod storage;
pub mod watermark;

pub use manager::StateManager;
pub use storage::{FileStateStorage, StateStorage};
pub use watermark::{RunStatus, RunWatermark, RunWatermarkBuilder};
