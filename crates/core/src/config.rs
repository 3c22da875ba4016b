//! Shared configuration types.
//!
//! The CLI reads `config.toml` into [`DiagConfig`]; the parsers crate only
//! sees the resolved [`TruncationLimits`] and root lists.

use crate::truncate::{MAX_OUTPUT_CHARS, MAX_OUTPUT_LINES};
use serde::{Deserialize, Serialize};

/// Conventional config file name under the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("limit `{field}` must be greater than zero")]
    ZeroLimit { field: &'static str },
}

/// Top-level configuration (persisted as `config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DiagConfig {
    #[serde(default)]
    pub limits: TruncationLimits,
    #[serde(default)]
    pub roots: RootSettings,
}

impl DiagConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DiagConfig = toml::from_str(text)?;
        config.limits.validate()?;
        Ok(config)
    }
}

/// Tool-output truncation limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TruncationLimits {
    #[serde(default = "default_max_lines")]
    pub max_output_lines: usize,
    #[serde(default = "default_max_chars")]
    pub max_output_chars: usize,
}

impl TruncationLimits {
    pub const fn new(max_output_lines: usize, max_output_chars: usize) -> Self {
        Self {
            max_output_lines,
            max_output_chars,
        }
    }

    /// Apply optional overrides (CLI flags win over file values).
    pub fn with_overrides(self, max_lines: Option<usize>, max_chars: Option<usize>) -> Self {
        Self {
            max_output_lines: max_lines.unwrap_or(self.max_output_lines),
            max_output_chars: max_chars.unwrap_or(self.max_output_chars),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_output_lines == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_output_lines",
            });
        }
        if self.max_output_chars == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_output_chars",
            });
        }
        Ok(())
    }
}

impl Default for TruncationLimits {
    fn default() -> Self {
        Self::new(MAX_OUTPUT_LINES, MAX_OUTPUT_CHARS)
    }
}

/// Session roots searched by `--latest`, per schema. Entries may use `~`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootSettings {
    #[serde(default = "default_claude_roots")]
    pub claude: Vec<String>,
    #[serde(default = "default_codex_roots")]
    pub codex: Vec<String>,
    #[serde(default = "default_pi_roots")]
    pub pi: Vec<String>,
}

impl RootSettings {
    /// Roots configured for a schema name; unknown names have none.
    pub fn for_schema(&self, schema: &str) -> &[String] {
        match schema {
            "claude" => &self.claude,
            "codex" => &self.codex,
            "pi" => &self.pi,
            _ => &[],
        }
    }
}

impl Default for RootSettings {
    fn default() -> Self {
        Self {
            claude: default_claude_roots(),
            codex: default_codex_roots(),
            pi: default_pi_roots(),
        }
    }
}

fn default_max_lines() -> usize {
    MAX_OUTPUT_LINES
}

fn default_max_chars() -> usize {
    MAX_OUTPUT_CHARS
}

fn default_claude_roots() -> Vec<String> {
    vec!["~/.claude/projects".to_string()]
}

fn default_codex_roots() -> Vec<String> {
    vec!["~/.codex/sessions".to_string()]
}

fn default_pi_roots() -> Vec<String> {
    vec!["~/.pi/agent/sessions".to_string(), "~/.pi/sessions".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DiagConfig::from_toml_str("").unwrap();
        assert_eq!(config, DiagConfig::default());
        assert_eq!(config.limits.max_output_lines, 8);
        assert_eq!(config.limits.max_output_chars, 500);
        assert_eq!(config.roots.for_schema("pi").len(), 2);
    }

    #[test]
    fn test_partial_limits() {
        let config = DiagConfig::from_toml_str("[limits]\nmax_output_lines = 3\n").unwrap();
        assert_eq!(config.limits, TruncationLimits::new(3, 500));
    }

    #[test]
    fn test_roots_override() {
        let config =
            DiagConfig::from_toml_str("[roots]\ncodex = [\"/srv/codex\"]\n").unwrap();
        assert_eq!(config.roots.codex, vec!["/srv/codex".to_string()]);
        assert_eq!(config.roots.claude, default_claude_roots());
        assert!(config.roots.for_schema("unknown").is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = DiagConfig::from_toml_str("[limits]\nmax_output_chars = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroLimit {
                field: "max_output_chars"
            }
        ));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = DiagConfig::from_toml_str("[limits\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_overrides() {
        let limits = TruncationLimits::default().with_overrides(Some(2), None);
        assert_eq!(limits, TruncationLimits::new(2, 500));
    }
}
