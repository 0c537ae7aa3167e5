pub mod config;
pub mod document;
pub mod filter;
pub mod metadata;
pub mod task;

pub use config::*;
pub use document::*;
pub use filter::*;
pub use metadata::*;
pub use task::*;
