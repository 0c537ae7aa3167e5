use serde::{Deserialize, Serialize};

/// Per-file settings from the YAML front matter. Every key is optional; an
/// absent key defers to the user config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_visible: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_headings: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_wrap: Option<bool>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}
