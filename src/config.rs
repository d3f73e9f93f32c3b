//! Library configuration supplied by the host's config loader.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::matcher::ComponentNameGrammar;

pub const DEFAULT_TAG_NAME_DELIMITER: &str = "-";
pub const DEFAULT_LIBRARY_PREFIX: &str = "tdc";
pub const DEFAULT_PERMUTATION_WARNING_THRESHOLD: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryConfig {
    /// Log every compiled usage at `info` level.
    pub debug: bool,
    /// Separates the segments of compound component names.
    pub tag_name_delimiter: String,
    pub library_prefix: String,
    /// Passed through untouched to the CSS toolchain.
    pub tailwind_config_path: Option<String>,
    /// Enumerations larger than this are reported with a warning.
    pub permutation_warning_threshold: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            debug: false,
            tag_name_delimiter: DEFAULT_TAG_NAME_DELIMITER.to_string(),
            library_prefix: DEFAULT_LIBRARY_PREFIX.to_string(),
            tailwind_config_path: None,
            permutation_warning_threshold: DEFAULT_PERMUTATION_WARNING_THRESHOLD,
        }
    }
}

impl LibraryConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LibraryConfig =
            serde_json::from_str(json).map_err(|e| RegistryError::InvalidConfig {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tag_name_delimiter.is_empty() {
            return Err(RegistryError::InvalidConfig {
                reason: "tagNameDelimiter must not be empty".to_string(),
            });
        }
        if self.tag_name_delimiter.chars().any(|c| c.is_ascii_alphabetic()) {
            return Err(RegistryError::InvalidConfig {
                reason: "tagNameDelimiter must not contain letters".to_string(),
            });
        }
        if self.library_prefix.is_empty()
            || !self.library_prefix.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(RegistryError::InvalidConfig {
                reason: format!("libraryPrefix '{}' must be alphabetic", self.library_prefix),
            });
        }
        Ok(())
    }

    pub fn name_grammar(&self) -> Result<ComponentNameGrammar> {
        ComponentNameGrammar::new(&self.library_prefix, &self.tag_name_delimiter)
    }
}
