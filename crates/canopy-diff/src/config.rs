use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// Default bound on tree fetches in flight for one diff.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 32;

/// Default bound on spawned subtree tasks alive at once for one diff.
pub const DEFAULT_MAX_SUBTREE_TASKS: usize = 64;

/// How a directory that exists on only one side is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryReport {
    /// One event at the directory's own path, with kind `Directory`. The
    /// one-sided subtree is never fetched.
    #[default]
    Collapsed,
    /// Walk the one-sided subtree and report every non-directory leaf.
    PerFile,
}

/// Tuning and policy knobs for a diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Maximum number of tree fetches in flight at once.
    pub max_concurrent_fetches: usize,
    /// Maximum number of subtree comparisons running as their own tasks.
    /// Past this, child directories are compared inside the parent's task.
    pub max_subtree_tasks: usize,
    /// Report a regular ↔ executable flip with unchanged content as modified.
    pub report_mode_changes: bool,
    /// Report added paths suppressed by the ignore filter as ignored.
    pub list_ignored: bool,
    pub directory_report: DirectoryReport,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_subtree_tasks: DEFAULT_MAX_SUBTREE_TASKS,
            report_mode_changes: true,
            list_ignored: false,
            directory_report: DirectoryReport::Collapsed,
        }
    }
}

impl DiffConfig {
    /// Parse a config from TOML. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> DiffResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| DiffError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would stall every diff.
    pub fn validate(&self) -> DiffResult<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(DiffError::Config(
                "max_concurrent_fetches must be at least 1".into(),
            ));
        }
        if self.max_subtree_tasks == 0 {
            return Err(DiffError::Config(
                "max_subtree_tasks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
