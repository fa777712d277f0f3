use std::path::{Path, PathBuf};

use resxtract::{NamespaceResolver, ProjectModel, suggest_key, validate_key};
use resxtract_cli::{Config, FsProject};

use crate::groups::{load_groups, select_group};

pub fn run_suggest_key_command(text: &str) -> Result<(), String> {
    let key = suggest_key(text);
    if key.is_empty() {
        return Err(format!("Cannot derive a key from '{}'", text));
    }
    println!("{}", key);
    Ok(())
}

pub fn run_check_key_command(
    project: &FsProject,
    key: &str,
    group: Option<PathBuf>,
) -> Result<(), String> {
    validate_key(key).map_err(|e| e.to_string())?;

    let groups = load_groups(project)?;
    let group = select_group(project, &groups, group.as_deref())?;
    if group.exists_key(key).map_err(|e| e.to_string())? {
        return Err(format!("Key '{}' already exists in {}", key, group.description()));
    }
    println!("Key '{}' is available in {}", key, group.description());
    Ok(())
}

pub fn run_namespace_command(config: &Config, project: &FsProject, file: &Path) -> Result<(), String> {
    let file = project.absolute(file)?;
    let namespace = NamespaceResolver::new(config.path_case())
        .resolve(&project.info(), &file)
        .map_err(|e| e.to_string())?;
    println!("{}", namespace);
    Ok(())
}
