pub mod dev_runner;
pub mod session;
pub mod store;

pub use session::SessionTracker;
pub use store::{ClearTarget, LogStore, LogStoreError};
