use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result, bail};
use farmboard_core::task::DEFAULT_LOCATION;
use farmboard_core::{Priority, TaskDefaults, TaskType};
use serde::Deserialize;

const CONFIG_DIR: &str = ".farmboard";
const CONFIG_FILE: &str = "config.toml";

/// Top-level project configuration loaded from `.farmboard/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub board: BoardConfig,
}

impl ProjectConfig {
    /// Load configuration from a working directory. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        let config_path = workdir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.board.ensure_unique_locations()?;
        self.board.ensure_valid_default_location()?;
        self.board.ensure_unique_assignees()
    }
}

/// Board configuration block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    default_location: String,
    locations: Vec<String>,
    assignees: Vec<String>,
    default_priority: Priority,
    default_task_type: TaskType,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_location: DEFAULT_LOCATION.to_owned(),
            locations: Self::builtin_locations(),
            assignees: Self::builtin_assignees(),
            default_priority: Priority::default(),
            default_task_type: TaskType::default(),
        }
    }
}

impl BoardConfig {
    fn builtin_locations() -> Vec<String> {
        [DEFAULT_LOCATION, "South Field", "Greenhouse A", "Greenhouse B"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn builtin_assignees() -> Vec<String> {
        ["John Doe", "Jane Smith", "Mike Johnson", "Sarah Wilson"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Known fields and greenhouses; empty means any location is accepted.
    #[must_use]
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Known assignees; empty means any name is accepted.
    #[must_use]
    pub fn assignees(&self) -> &[String] {
        &self.assignees
    }

    /// Location given to tasks that do not name one.
    #[must_use]
    pub fn default_location(&self) -> &str {
        &self.default_location
    }

    /// Defaults handed to the task factory.
    #[must_use]
    pub fn defaults(&self) -> TaskDefaults {
        TaskDefaults {
            location: self.default_location.clone(),
            priority: self.default_priority,
            task_type: self.default_task_type,
        }
    }

    /// Check that `location` is allowed by the configuration.
    ///
    /// # Errors
    /// Returns an error when a location list is configured and does not contain `location`.
    pub fn ensure_location(&self, location: &str) -> Result<()> {
        if self.locations.is_empty() || self.locations.iter().any(|known| known == location) {
            return Ok(());
        }
        bail!(
            "unknown location '{location}'. Allowed locations: {}",
            self.locations.join(", ")
        );
    }

    /// Check that `assignee` is allowed by the configuration.
    ///
    /// # Errors
    /// Returns an error when an assignee list is configured and does not contain `assignee`.
    pub fn ensure_assignee(&self, assignee: &str) -> Result<()> {
        if self.assignees.is_empty() || self.assignees.iter().any(|known| known == assignee) {
            return Ok(());
        }
        bail!(
            "unknown assignee '{assignee}'. Allowed assignees: {}",
            self.assignees.join(", ")
        );
    }

    fn ensure_unique_locations(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for location in &self.locations {
            if location.trim().is_empty() {
                bail!("board.locations must not contain blank entries");
            }
            if !seen.insert(location.as_str()) {
                bail!("duplicate location '{location}' in board.locations");
            }
        }
        Ok(())
    }

    fn ensure_valid_default_location(&self) -> Result<()> {
        if self.default_location.trim().is_empty() {
            bail!("board.default_location must not be empty");
        }
        self.ensure_location(&self.default_location)
            .context("board.default_location must be one of board.locations")
    }

    fn ensure_unique_assignees(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for assignee in &self.assignees {
            if !seen.insert(assignee.as_str()) {
                bail!("duplicate assignee '{assignee}' in board.assignees");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_builtin_board() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let config = ProjectConfig::from_workdir(dir.path()).unwrap_or_else(|err| panic!("load: {err}"));
        assert_eq!(config.board.default_location(), "North Field");
        assert_eq!(config.board.locations().len(), 4);
        assert_eq!(config.board.defaults(), TaskDefaults::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap_or_else(|err| panic!("mkdir: {err}"));
        fs::write(
            config_dir.join(CONFIG_FILE),
            r#"
[board]
default_location = "Orchard"
locations = ["Orchard", "Greenhouse A"]
default_priority = "High"
default_task_type = "pruning"
"#,
        )
        .unwrap_or_else(|err| panic!("write: {err}"));

        let config = ProjectConfig::from_workdir(dir.path()).unwrap_or_else(|err| panic!("load: {err}"));
        let defaults = config.board.defaults();
        assert_eq!(defaults.location, "Orchard");
        assert_eq!(defaults.priority, Priority::High);
        assert_eq!(defaults.task_type, TaskType::Pruning);
        assert_eq!(config.board.assignees().len(), 4);
        assert!(config.board.ensure_location("South Field").is_err());
    }

    #[test]
    fn default_location_must_be_listed() {
        let err = ProjectConfig::from_toml(
            r#"
[board]
default_location = "Barn"
locations = ["North Field"]
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn duplicate_locations_are_rejected() {
        let err = ProjectConfig::from_toml(
            r#"
[board]
locations = ["North Field", "North Field"]
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn empty_lists_accept_anything() {
        let config = ProjectConfig::from_toml(
            r#"
[board]
default_location = "Back Forty"
locations = []
assignees = []
"#,
        )
        .unwrap_or_else(|err| panic!("parse: {err}"));
        assert!(config.board.ensure_location("Anywhere").is_ok());
        assert!(config.board.ensure_assignee("Anyone").is_ok());
    }
}
