//! Sandsh Configuration
//!
//! YAML-based configuration for the sandsh shell.
//!
//! # Configuration Loading Priority
//!
//! 1. Compiled-in defaults
//! 2. `/etc/sandsh/sandsh.yaml` (system-wide)
//! 3. `~/.config/sandsh/sandsh.yaml` (user)
//! 4. `./sandsh.yaml` (project-local)
//! 5. `SANDSH_CONFIG=/path/to/config.yaml` (explicit)
//! 6. Environment variables (highest priority)
//!
//! # Example Configuration
//!
//! ```yaml
//! shell:
//!   prompt: "sandsh:{cwd}$ "
//!   env:
//!     LANG: en_US.UTF-8
//!   startup:
//!     - mkdir -p /home/user
//!     - cd /home/user
//!
//! logging:
//!   level: debug
//! ```

#![allow(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::*;

/// Load configuration from default locations.
///
/// Searches for config files in order and merges them.
/// Environment variables override file values.
pub fn load() -> Result<SandshConfig, ConfigError> {
    ConfigLoader::new().load()
}

/// Load configuration from a specific file.
pub fn load_from_file(path: &str) -> Result<SandshConfig, ConfigError> {
    ConfigLoader::new().with_file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SandshConfig::default();
        assert_eq!(config.shell.prompt, "sandsh:{cwd}$ ");
        assert!(config.shell.history.enabled);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = r#"
shell:
  prompt: "> "
"#;
        let config: SandshConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.shell.prompt, "> ");
        assert_eq!(config.shell.history.max_entries, 10000); // default
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
shell:
  prompt: "work:{cwd}> "
  env:
    EDITOR: vi
  startup:
    - mkdir -p /tmp
  history:
    file: "~/.my_history"
    max_entries: 500

logging:
  level: debug
  format: json
"#;
        let config: SandshConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.shell.prompt, "work:{cwd}> ");
        assert_eq!(config.shell.env.get("EDITOR").map(String::as_str), Some("vi"));
        assert_eq!(config.shell.history.max_entries, 500);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
