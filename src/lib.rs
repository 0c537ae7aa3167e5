//! marklist: a filtered, hierarchical view over a markdown todo list that
//! writes every change straight back to the file and reconciles with
//! edits made underneath it.

pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod parse;
pub mod session;
pub mod util;
pub mod view;
