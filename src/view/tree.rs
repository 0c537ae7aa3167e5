use serde::Serialize;

use crate::model::filter::FilterState;
use crate::model::task::{Heading, TaskEntry};
use crate::view::ViewContext;
use crate::view::sections::SectionAnchors;
use crate::view::visibility::is_visible;

/// A node as it appears in the filtered view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VisibleNode {
    Heading {
        level: u8,
        text: String,
        /// False when every task in the section is hidden; the heading is
        /// kept and flagged as filtered
        has_visible_descendant: bool,
    },
    Task {
        /// Index into the document's task list
        index: usize,
    },
}

/// Arena entry: the node plus the arena index of its enclosing heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub node: VisibleNode,
    pub parent: Option<usize>,
    /// Number of enclosing headings
    pub depth: usize,
}

/// The flattened depth-first view: headings and visible tasks in document
/// order, plus the selected position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
    /// Position in `nodes` of the selected task
    pub selected: Option<usize>,
}

impl Tree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, pos: usize) -> Option<&VisibleNode> {
        self.nodes.get(pos).map(|n| &n.node)
    }

    /// Underlying task index at `pos`, if that node is a task
    pub fn task_at(&self, pos: usize) -> Option<usize> {
        match self.node(pos)? {
            VisibleNode::Task { index } => Some(*index),
            VisibleNode::Heading { .. } => None,
        }
    }

    /// Position of the node for underlying task `index`
    pub fn position_of_task(&self, index: usize) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.node == VisibleNode::Task { index })
    }

    /// Underlying indices of all visible tasks, ascending
    pub fn visible_tasks(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter_map(|p| self.task_at(p)).collect()
    }

    pub fn is_task_visible(&self, index: usize) -> bool {
        self.position_of_task(index).is_some()
    }

    /// Underlying index of the selected task
    pub fn selected_task(&self) -> Option<usize> {
        self.selected.and_then(|p| self.task_at(p))
    }

    /// Point the selection at underlying task `index` (cleared if hidden)
    pub fn select_task(&mut self, index: Option<usize>) {
        self.selected = index.and_then(|i| self.position_of_task(i));
    }
}

/// Builds the filtered tree from the task stream and extracted headings
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder {
    ctx: ViewContext,
}

impl TreeBuilder {
    pub fn new(ctx: ViewContext) -> Self {
        TreeBuilder { ctx }
    }

    /// Single pass over the tasks with a stack of open headings. Headings
    /// sharing an anchor keep document order. Every heading is emitted; the
    /// ones with no visible task in their section are flagged.
    pub fn build(&self, tasks: &[&TaskEntry], headings: &[Heading], filters: &FilterState) -> Tree {
        let anchors = SectionAnchors::new(headings, tasks.len());
        let mut nodes: Vec<TreeNode> = Vec::with_capacity(tasks.len() + headings.len());
        // (level, arena index); the synthetic root is level 0 with no node
        let mut stack: Vec<(u8, Option<usize>)> = vec![(0, None)];

        for (index, task) in tasks.iter().enumerate() {
            for &h in &anchors.before[index] {
                push_heading(&mut nodes, &mut stack, &headings[h]);
            }
            if is_visible(task, filters, self.ctx.today) {
                for &(_, node) in &stack {
                    if let Some(pos) = node {
                        mark_visible(&mut nodes[pos]);
                    }
                }
                nodes.push(TreeNode {
                    node: VisibleNode::Task { index },
                    parent: stack.last().and_then(|&(_, n)| n),
                    depth: stack.len() - 1,
                });
            }
        }
        for &h in &anchors.trailing {
            push_heading(&mut nodes, &mut stack, &headings[h]);
        }

        Tree {
            nodes,
            selected: None,
        }
    }
}

fn push_heading(nodes: &mut Vec<TreeNode>, stack: &mut Vec<(u8, Option<usize>)>, heading: &Heading) {
    while stack.len() > 1 && stack.last().is_some_and(|&(level, _)| level >= heading.level) {
        stack.pop();
    }
    let pos = nodes.len();
    nodes.push(TreeNode {
        node: VisibleNode::Heading {
            level: heading.level,
            text: heading.text.clone(),
            has_visible_descendant: false,
        },
        parent: stack.last().and_then(|&(_, n)| n),
        depth: stack.len() - 1,
    });
    stack.push((heading.level, Some(pos)));
}

fn mark_visible(node: &mut TreeNode) {
    if let VisibleNode::Heading {
        has_visible_descendant,
        ..
    } = &mut node.node
    {
        *has_visible_descendant = true;
    }
}
