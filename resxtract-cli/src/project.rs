use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use quick_xml::{Reader, events::Event};
use resxtract::{Error, ProjectInfo, ProjectModel};

use crate::config::{Config, load_config};

const PROJECT_EXTENSION: &str = "csproj";

/// A project directory on disk.
///
/// The project name is the stem of the single `*.csproj` in the root, or
/// the directory name when there is none (or more than one). Only a
/// `<RootNamespace>` or a configured override counts as an explicit default
/// namespace; otherwise it is derived from the project name.
#[derive(Debug, Clone)]
pub struct FsProject {
    info: ProjectInfo,
    exclude: GlobSet,
}

impl FsProject {
    pub fn open(root: &Path, config: &Config) -> Result<Self, String> {
        let root = fs::canonicalize(root)
            .map_err(|e| format!("cannot open project {}: {}", root.display(), e))?;
        if !root.is_dir() {
            return Err(format!("{} is not a directory", root.display()));
        }

        let project_file = find_project_file(&root)?;
        let (name, declared_namespace) = match &project_file {
            Some(file) => {
                let name = file
                    .file_stem()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let content = fs::read_to_string(file)
                    .map_err(|e| format!("cannot read {}: {}", file.display(), e))?;
                (name, read_root_namespace(&content))
            }
            None => {
                let name = root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Project".to_string());
                (name, None)
            }
        };

        let default_namespace = config.default_namespace.clone().or(declared_namespace);
        tracing::debug!(
            root = %root.display(),
            project = %name,
            default_namespace = ?default_namespace,
            "opened project"
        );

        Ok(FsProject {
            info: ProjectInfo::new(root, name).with_default_namespace(default_namespace),
            exclude: build_globset(&config.exclude)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.info.root
    }

    /// Resolves a path given on the command line to an absolute one.
    pub fn absolute(&self, path: &Path) -> Result<PathBuf, String> {
        fs::canonicalize(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path.strip_prefix(&self.info.root)
            .map(|relative| self.exclude.is_match(relative))
            .unwrap_or(false)
    }
}

impl ProjectModel for FsProject {
    fn info(&self) -> ProjectInfo {
        self.info.clone()
    }

    fn files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>, Error> {
        let walker = WalkBuilder::new(&self.info.root)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Error::host(e.to_string()))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if matches && !self.is_excluded(path) {
                files.push(path.to_path_buf());
            }
        }
        Ok(files)
    }
}

/// Loads the configuration for `project_dir` and opens the project.
pub fn open_project(project_dir: &Path, config_path: Option<&Path>) -> Result<(Config, FsProject), String> {
    let config = load_config(project_dir, config_path)?;
    let project = FsProject::open(project_dir, &config)?;
    Ok((config, project))
}

fn find_project_file(root: &Path) -> Result<Option<PathBuf>, String> {
    let entries =
        fs::read_dir(root).map_err(|e| format!("cannot list {}: {}", root.display(), e))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(PROJECT_EXTENSION))
        })
        .collect();

    if candidates.len() > 1 {
        tracing::warn!(
            count = candidates.len(),
            "several project files in {}, using the directory name",
            root.display()
        );
        return Ok(None);
    }
    Ok(candidates.pop())
}

/// The first non-empty `<RootNamespace>` in a project file.
pub fn read_root_namespace(content: &str) -> Option<String> {
    let mut reader = Reader::from_str(content);
    let mut inside = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => inside = e.name().as_ref() == b"RootNamespace",
            Ok(Event::Text(t)) if inside => {
                let value = t.unescape().ok()?.trim().to_string();
                if !value.is_empty() {
                    return Some(value);
                }
            }
            Ok(Event::End(_)) => inside = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| format!("Failed to build glob set: {}", e))
}
