pub mod cache;
pub mod move_engine;
pub mod navigate;
pub mod sections;
pub mod selection;
pub mod tree;
pub mod visibility;

use chrono::NaiveDate;

pub use cache::ViewCache;
pub use move_engine::{MoveEngine, MoveOutcome};
pub use navigate::Direction;
pub use tree::{Tree, TreeBuilder, TreeNode, VisibleNode};

/// Values the view layer needs from outside, injected once by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewContext {
    /// Reference date for due-date buckets
    pub today: NaiveDate,
}

impl ViewContext {
    pub fn new(today: NaiveDate) -> Self {
        ViewContext { today }
    }

    /// Context for the local calendar date
    pub fn local() -> Self {
        ViewContext::new(chrono::Local::now().date_naive())
    }
}
