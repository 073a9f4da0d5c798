//! Compiler configuration.
//!
//! ```toml
//! [naming]
//! members = "camel"      # or "preserve"
//!
//! [paging]
//! default_top = 100      # applied to stream queries without an explicit take
//! ```

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("paging.default_top must be greater than zero")]
    ZeroDefaultTop,
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, err.to_string())
    }
}

///
/// MemberNaming
///
/// How host member names map onto wire names.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberNaming {
    #[default]
    Camel,
    Preserve,
}

impl MemberNaming {
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Camel => name.to_case(Case::Camel),
            Self::Preserve => name.to_string(),
        }
    }
}

///
/// CompilerConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub paging: PagingConfig,
}

impl CompilerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    pub const fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.paging.default_top, Some(0)) {
            return Err(ConfigError::ZeroDefaultTop);
        }

        Ok(())
    }
}

///
/// NamingConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NamingConfig {
    #[serde(default)]
    pub members: MemberNaming,
}

///
/// PagingConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PagingConfig {
    #[serde(default)]
    pub default_top: Option<u32>,
}

///
/// TESTS
///
