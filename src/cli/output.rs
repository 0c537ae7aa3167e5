use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::document::Document;
use crate::model::filter::FilterState;
use crate::model::task::TaskEntry;
use crate::view::{Tree, VisibleNode};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    /// 1-based task number
    pub number: usize,
    pub text: String,
    pub checked: bool,
    pub depth: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeJson {
    Heading { level: u8, text: String, filtered: bool },
    Task(TaskJson),
}

#[derive(Serialize)]
pub struct ListJson {
    pub file: PathBuf,
    pub filters: FilterState,
    pub nodes: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct ChangeJson {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<usize>,
    pub message: String,
}

#[derive(Serialize)]
pub struct RecentJson {
    pub number: usize,
    pub path: PathBuf,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub fn task_to_json(index: usize, task: &TaskEntry) -> TaskJson {
    TaskJson {
        number: index + 1,
        text: task.text.clone(),
        checked: task.checked,
        depth: task.depth,
        tags: task.tags.clone(),
        priority: Some(task.priority).filter(|&p| p > 0),
        due: task.due,
    }
}

pub fn tree_to_json(tree: &Tree, doc: &Document) -> Vec<NodeJson> {
    tree.nodes
        .iter()
        .filter_map(|n| match &n.node {
            VisibleNode::Heading {
                level,
                text,
                has_visible_descendant,
            } => Some(NodeJson::Heading {
                level: *level,
                text: text.clone(),
                filtered: !has_visible_descendant,
            }),
            VisibleNode::Task { index } => doc.task(*index).map(|t| NodeJson::Task(task_to_json(*index, t))),
        })
        .collect()
}
