use serde::{Deserialize, Serialize};

use crate::model::metadata::Metadata;

/// User configuration from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub recent: RecentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// 0 = unlimited
    #[serde(default)]
    pub max_visible: usize,
    #[serde(default)]
    pub show_headings: bool,
    #[serde(default = "default_true")]
    pub word_wrap: bool,
    #[serde(default)]
    pub line_numbers: bool,
    #[serde(default)]
    pub filter_done: bool,
    #[serde(default = "default_check_symbol")]
    pub check_symbol: String,
    #[serde(default = "default_select_marker")]
    pub select_marker: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            max_visible: 0,
            show_headings: false,
            word_wrap: true,
            line_numbers: false,
            filter_done: false,
            check_symbol: default_check_symbol(),
            select_marker: default_select_marker(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecentConfig {
    #[serde(default = "default_max_recent")]
    pub max_entries: usize,
}

impl Default for RecentConfig {
    fn default() -> Self {
        RecentConfig {
            max_entries: default_max_recent(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_check_symbol() -> String {
    "x".to_string()
}

fn default_select_marker() -> String {
    ">".to_string()
}

fn default_max_recent() -> usize {
    20
}

/// Settings given on the command line; `None` defers to the file and config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub read_only: bool,
    pub show_headings: bool,
    pub max_visible: Option<usize>,
}

/// Effective session settings after layering
/// command line > front matter > user config > defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub filter_done: bool,
    pub max_visible: usize,
    pub show_headings: bool,
    pub word_wrap: bool,
    pub line_numbers: bool,
    pub read_only: bool,
    pub check_symbol: String,
    pub select_marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::resolve(&UserConfig::default(), &Metadata::default(), &Overrides::default())
    }
}

impl Settings {
    pub fn resolve(config: &UserConfig, meta: &Metadata, overrides: &Overrides) -> Settings {
        let display = &config.display;
        Settings {
            filter_done: meta.filter_done.unwrap_or(display.filter_done),
            max_visible: overrides
                .max_visible
                .or(meta.max_visible)
                .unwrap_or(display.max_visible),
            show_headings: overrides.show_headings
                || meta.show_headings.unwrap_or(display.show_headings),
            word_wrap: meta.word_wrap.unwrap_or(display.word_wrap),
            line_numbers: display.line_numbers,
            read_only: overrides.read_only || meta.read_only.unwrap_or(false),
            check_symbol: display.check_symbol.clone(),
            select_marker: display.select_marker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_source() {
        let s = Settings::default();
        assert!(!s.filter_done);
        assert_eq!(s.max_visible, 0);
        assert!(s.word_wrap);
        assert!(!s.read_only);
    }

    #[test]
    fn front_matter_beats_user_config() {
        let mut config = UserConfig::default();
        config.display.max_visible = 10;
        config.display.filter_done = true;
        let meta = Metadata {
            max_visible: Some(5),
            filter_done: Some(false),
            ..Default::default()
        };
        let s = Settings::resolve(&config, &meta, &Overrides::default());
        assert_eq!(s.max_visible, 5);
        assert!(!s.filter_done);
    }

    #[test]
    fn command_line_beats_front_matter() {
        let meta = Metadata {
            max_visible: Some(5),
            read_only: Some(false),
            ..Default::default()
        };
        let overrides = Overrides {
            read_only: true,
            show_headings: true,
            max_visible: Some(3),
        };
        let s = Settings::resolve(&UserConfig::default(), &meta, &overrides);
        assert_eq!(s.max_visible, 3);
        assert!(s.read_only);
        assert!(s.show_headings);
    }

    #[test]
    fn parse_partial_toml() {
        let config: UserConfig = toml::from_str("[display]\nmax-visible = 8\n").unwrap();
        assert_eq!(config.display.max_visible, 8);
        assert!(config.display.word_wrap);
        assert_eq!(config.recent.max_entries, 20);
    }
}
