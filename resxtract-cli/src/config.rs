use std::fs;
use std::path::{Path, PathBuf};

use resxtract::{ExternalizerSettings, PathCase};
use serde::Deserialize;

/// File looked up in the project root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "resxtract.toml";

const MAX_RETRY_ATTEMPTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub default_namespace: Option<String>,
    pub case_insensitive_paths: bool,
    pub retry_attempts: usize,
    pub exclude: Vec<String>,
    pub regenerate: Option<Vec<String>>,
    pub source_extensions: Vec<String>,
    pub markup_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let library = ExternalizerSettings::default();
        Self {
            default_namespace: None,
            case_insensitive_paths: library.path_case == PathCase::Insensitive,
            retry_attempts: library.attempts,
            exclude: vec!["bin/**".to_string(), "obj/**".to_string()],
            regenerate: None,
            source_extensions: library.source_extensions,
            markup_extensions: library.markup_extensions,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    default_namespace: Option<String>,
    case_insensitive_paths: Option<bool>,
    retry_attempts: Option<usize>,
    exclude: Option<Vec<String>>,
    regenerate: Option<Vec<String>>,
    source_extensions: Option<Vec<String>>,
    markup_extensions: Option<Vec<String>>,
}

/// Loads `explicit`, or `resxtract.toml` in `project_root` when present.
pub fn load_config(project_root: &Path, explicit: Option<&Path>) -> Result<Config, String> {
    let mut config = Config::default();

    let path: PathBuf = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(format!("config file not found: {}", path.display()));
            }
            path.to_path_buf()
        }
        None => project_root.join(CONFIG_FILE_NAME),
    };
    if !path.exists() {
        return Ok(config);
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    config
        .merge_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    tracing::debug!(config = %path.display(), "loaded configuration");
    Ok(config)
}

impl Config {
    fn merge_str(&mut self, content: &str) -> Result<(), String> {
        let parsed: ConfigFile = toml::from_str(content).map_err(|e| e.to_string())?;
        self.merge(parsed)
    }

    fn merge(&mut self, incoming: ConfigFile) -> Result<(), String> {
        if let Some(namespace) = incoming.default_namespace {
            if !namespace.trim().is_empty() {
                self.default_namespace = Some(namespace.trim().to_string());
            }
        }
        if let Some(insensitive) = incoming.case_insensitive_paths {
            self.case_insensitive_paths = insensitive;
        }
        if let Some(attempts) = incoming.retry_attempts {
            if !(1..=MAX_RETRY_ATTEMPTS).contains(&attempts) {
                return Err(format!(
                    "retry_attempts must be between 1 and {}, got {}",
                    MAX_RETRY_ATTEMPTS, attempts
                ));
            }
            self.retry_attempts = attempts;
        }
        if let Some(exclude) = incoming.exclude {
            self.exclude = exclude;
        }
        if let Some(command) = incoming.regenerate {
            if command.is_empty() {
                return Err("regenerate must name a program".to_string());
            }
            self.regenerate = Some(command);
        }
        if let Some(extensions) = incoming.source_extensions {
            self.source_extensions = normalize_extensions(extensions);
        }
        if let Some(extensions) = incoming.markup_extensions {
            self.markup_extensions = normalize_extensions(extensions);
        }
        Ok(())
    }

    pub fn path_case(&self) -> PathCase {
        if self.case_insensitive_paths {
            PathCase::Insensitive
        } else {
            PathCase::Sensitive
        }
    }

    pub fn externalizer_settings(&self) -> ExternalizerSettings {
        ExternalizerSettings {
            path_case: self.path_case(),
            attempts: self.retry_attempts,
            source_extensions: self.source_extensions.clone(),
            markup_extensions: self.markup_extensions.clone(),
        }
    }
}

/// `".CS"` and `"cs"` both mean `cs`.
fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
