pub mod config_io;
pub mod recent;
pub mod store;
pub mod watcher;

pub use store::{BackingStore, FileStore, StoreError, atomic_write};
