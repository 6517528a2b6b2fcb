use crate::{ConfigError, SandshConfig};
use regex::Regex;
use std::path::PathBuf;

pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(".config/sandsh/sandsh.yaml"));
        }
        search_paths.push(PathBuf::from("./sandsh.yaml"));

        #[cfg(unix)]
        search_paths.insert(0, PathBuf::from("/etc/sandsh/sandsh.yaml"));

        Self {
            explicit_file: None,
            search_paths,
        }
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.explicit_file = Some(PathBuf::from(path));
        self
    }

    pub fn load(&self) -> Result<SandshConfig, ConfigError> {
        let mut config = SandshConfig::default();

        if let Ok(env_path) = std::env::var("SANDSH_CONFIG") {
            let content =
                std::fs::read_to_string(&env_path).map_err(|e| ConfigError::ReadFile {
                    path: PathBuf::from(&env_path),
                    source: e,
                })?;
            config = self.parse_yaml(&content)?;
        } else if let Some(ref explicit) = self.explicit_file {
            let content = std::fs::read_to_string(explicit).map_err(|e| ConfigError::ReadFile {
                path: explicit.clone(),
                source: e,
            })?;
            config = self.parse_yaml(&content)?;
        } else {
            for path in &self.search_paths {
                if path.exists() {
                    if let Ok(content) = std::fs::read_to_string(path) {
                        tracing::debug!(path = %path.display(), "merging config file");
                        config = self.merge_yaml(&config, &content)?;
                    }
                }
            }
        }

        self.apply_env_overrides(&mut config);
        Ok(config)
    }

    fn parse_yaml(&self, content: &str) -> Result<SandshConfig, ConfigError> {
        let expanded = self.expand_env_vars(content);
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn merge_yaml(&self, base: &SandshConfig, content: &str) -> Result<SandshConfig, ConfigError> {
        let expanded = self.expand_env_vars(content);
        let overlay: SandshConfig = serde_yaml::from_str(&expanded)?;
        Ok(self.merge_configs(base, &overlay))
    }

    fn merge_configs(&self, base: &SandshConfig, overlay: &SandshConfig) -> SandshConfig {
        let defaults = SandshConfig::default();
        let mut result = base.clone();

        if overlay.shell.prompt != defaults.shell.prompt {
            result.shell.prompt = overlay.shell.prompt.clone();
        }
        if !overlay.shell.env.is_empty() {
            result
                .shell
                .env
                .extend(overlay.shell.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if !overlay.shell.startup.is_empty() {
            result.shell.startup = overlay.shell.startup.clone();
        }
        if overlay.shell.history.file != defaults.shell.history.file
            || overlay.shell.history.max_entries != defaults.shell.history.max_entries
            || overlay.shell.history.enabled != defaults.shell.history.enabled
        {
            result.shell.history = overlay.shell.history.clone();
        }
        if overlay.logging.level != defaults.logging.level
            || overlay.logging.format != defaults.logging.format
            || !overlay.logging.filter.is_empty()
        {
            result.logging = overlay.logging.clone();
        }

        result
    }

    fn expand_env_vars(&self, content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .to_string()
    }

    fn apply_env_overrides(&self, config: &mut SandshConfig) {
        if let Ok(prompt) = std::env::var("SANDSH_PROMPT") {
            if !prompt.is_empty() {
                config.shell.prompt = prompt;
            }
        }
        if let Ok(file) = std::env::var("SANDSH_HISTORY_FILE") {
            if !file.is_empty() {
                config.shell.history.file = file;
            }
        }
        if let Ok(level) = std::env::var("SANDSH_LOG_LEVEL") {
            if let Ok(l) = serde_yaml::from_str(&level) {
                config.logging.level = l;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_env_vars_works() {
        std::env::set_var("TEST_VAR_123", "hello");
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${TEST_VAR_123}");
        assert_eq!(result, "value: hello");
        std::env::remove_var("TEST_VAR_123");
    }

    #[test]
    fn missing_env_var_becomes_empty() {
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${NONEXISTENT_VAR_XYZ}");
        assert_eq!(result, "value: ");
    }

    #[test]
    fn env_overrides_config() {
        std::env::set_var("SANDSH_PROMPT", "test> ");
        let mut config = SandshConfig::default();
        let loader = ConfigLoader::new();
        loader.apply_env_overrides(&mut config);
        assert_eq!(config.shell.prompt, "test> ");
        std::env::remove_var("SANDSH_PROMPT");
    }

    #[test]
    fn explicit_file_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandsh.yaml");
        std::fs::write(
            &path,
            "shell:\n  prompt: \"mini> \"\n  startup:\n    - mkdir -p /home/user\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(path.to_str().unwrap())
            .load()
            .unwrap();
        assert_eq!(config.shell.prompt, "mini> ");
        assert_eq!(config.shell.startup, vec!["mkdir -p /home/user"]);
    }
}
