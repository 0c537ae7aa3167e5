pub mod merge;
pub mod search;
pub mod sort;
pub mod task_ops;
pub mod universe;
