use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HookError, HookResult};

/// Feature switches for the move/delete hook.
///
/// The hook never reads preferences on its own; the embedding host builds a
/// `HookConfig` (usually from `hooks.toml` in the metadata directory) and
/// passes it to [`MoveDeleteHook::new`](crate::MoveDeleteHook::new).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Remove a file's index entry when the file is deleted.
    pub auto_stage_deletion: bool,
    /// Rewrite index entries when files and folders are moved.
    pub auto_stage_moves: bool,
    /// Allow moving a project into one of its own subfolders. Off by
    /// default: the host's recursive copy would otherwise consume the
    /// project it is copying.
    pub allow_nested_project_move: bool,
    /// Name of the repository metadata directory. Folders with this name
    /// cannot be deleted through the hook.
    pub metadata_dir_name: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            auto_stage_deletion: true,
            auto_stage_moves: true,
            allow_nested_project_move: false,
            metadata_dir_name: ".wll".to_string(),
        }
    }
}

impl HookConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> HookResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| HookError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> HookResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> HookResult<()> {
        let name = self.metadata_dir_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(HookError::Config(format!(
                "metadata_dir_name must be a single path component, got {name:?}"
            )));
        }
        Ok(())
    }
}
