/// Snapshot and settings persistence backends.
pub mod snapshot_store;
/// Storage abstraction layer shared by every backend.
pub mod storage;
