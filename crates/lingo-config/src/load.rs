use std::path::{Path, PathBuf};

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Content written into a newly-created default config file.
const DEFAULT_CONFIG_CONTENT: &str = r#"# lingo server configuration
# Uncomment and edit settings below to override defaults.

# one_based_indices = false
# partial_failure = "fail_fast"
# timeout_secs = 2
# enable_misc_files = true

# [restore]
# program = "dotnet"
# args = ["restore"]
# concurrency = 0

# [log]
# level = "info"
"#;

/// Load and merge configuration.
///
/// 1. Reads the global config from `config_dir/config.toml`.
///    If the file does not exist it is created with commented-out
///    defaults.
/// 2. Optionally reads a workspace config from
///    `workspace_dir/.lingo/config.toml` (walks upward).
/// 3. Merges: `ServerConfig::default() <- global <- workspace`.
/// 4. Validates the merged result.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O failure, parse failure, or
/// validation failure.
pub fn load_config(
    config_dir: &Path,
    workspace_dir: Option<&Path>,
) -> Result<ServerConfig, ConfigError> {
    let global_path = config_dir.join("config.toml");

    // Ensure config dir exists
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)?;
    }

    // Create default config if missing
    if !global_path.exists() {
        std::fs::write(&global_path, DEFAULT_CONFIG_CONTENT)
            .map_err(|e| ConfigError::CreateDefault(e.to_string()))?;
        tracing::info!("Created default config at {}", global_path.display());
    }

    // Start with defaults
    let mut config = ServerConfig::default();

    // Merge global config
    let global_content = std::fs::read_to_string(&global_path)?;
    if has_non_comment_content(&global_content) {
        config = merge_configs(&config, &global_content)?;
    }

    // Merge workspace config
    if let Some(dir) = workspace_dir {
        if let Some(workspace_path) = find_workspace_config(dir) {
            let workspace_content = std::fs::read_to_string(&workspace_path)?;
            config = merge_configs(&config, &workspace_content)?;
        }
    }

    // Validate
    validate(&config).map_err(first_validation_error)?;

    Ok(config)
}

/// Parse a TOML string directly into a validated [`ServerConfig`].
///
/// Useful for tests or one-off parsing without file I/O.
///
/// # Errors
///
/// Returns [`ConfigError`] on parse or validation failure.
pub fn load_from_str(toml_str: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig =
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&config).map_err(first_validation_error)?;

    Ok(config)
}

fn first_validation_error(errors: Vec<ConfigError>) -> ConfigError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| ConfigError::Validation {
            field: "unknown".to_string(),
            message: "validation failed".to_string(),
        })
}

/// Walk from `start` upward looking for `.lingo/config.toml`.
fn find_workspace_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(".lingo").join("config.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Returns `true` when the content has at least one
/// non-empty, non-comment line.
fn has_non_comment_content(content: &str) -> bool {
    content.lines().any(|l| {
        let trimmed = l.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_config_creates_default_when_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config, ServerConfig::default());

        // File was created
        let created = cfg_dir.join("config.toml");
        assert!(created.exists());
    }

    #[test]
    fn load_config_reads_existing_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "timeout_secs = 30\n").unwrap();

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config.timeout_secs, 30);
        // Unmodified fields keep defaults
        assert!(config.enable_misc_files);
    }

    #[test]
    fn load_config_merges_workspace_over_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "timeout_secs = 30\n").unwrap();

        let ws_dir = tmp.path().join("workspace");
        let lingo_dir = ws_dir.join(".lingo");
        std::fs::create_dir_all(&lingo_dir).unwrap();
        std::fs::write(lingo_dir.join("config.toml"), "timeout_secs = 5\n").unwrap();

        let config = load_config(&cfg_dir, Some(&ws_dir)).unwrap();
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn load_from_str_parses_valid_toml() {
        let toml = "one_based_indices = true\n";
        let config = load_from_str(toml).unwrap();
        assert!(config.one_based_indices);
    }

    #[test]
    fn load_from_str_rejects_invalid_toml() {
        let result = load_from_str("{{bad}}");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_str_rejects_invalid_values() {
        let toml = "timeout_secs = 0\n";
        let result = load_from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn find_workspace_config_walks_up() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("repo");
        let lingo = root.join(".lingo");
        std::fs::create_dir_all(&lingo).unwrap();
        std::fs::write(lingo.join("config.toml"), "timeout_secs = 5\n").unwrap();

        let deep = root.join("src").join("module");
        std::fs::create_dir_all(&deep).unwrap();

        let found = find_workspace_config(&deep);
        assert!(found.is_some());
        assert!(found.unwrap().ends_with(".lingo/config.toml"));
    }

    #[test]
    fn default_config_content_parses_as_defaults() {
        // The comment-only template should produce defaults
        assert!(!has_non_comment_content(DEFAULT_CONFIG_CONTENT));
    }

    #[test]
    fn has_non_comment_content_detects_values() {
        assert!(!has_non_comment_content(""));
        assert!(!has_non_comment_content("# comment\n"));
        assert!(has_non_comment_content("# comment\ntimeout_secs = 4\n"));
    }
}
