//! Namespace inference from a file's location inside a project.
//!
//! `App` + `/P/Views/Sub/File.cs` under root `/P` gives `App.Views.Sub`.
//! Directory names are used as-is; a folder named `My-Folder` produces a
//! segment that is not a valid identifier.

use std::{
    ffi::OsStr,
    path::{Component, Path, PathBuf},
};

use serde::Serialize;

use crate::error::Error;

/// How path components are compared when testing project membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathCase {
    Sensitive,
    Insensitive,
}

impl PathCase {
    /// The convention of the file system this binary was built for.
    pub fn native() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            PathCase::Insensitive
        } else {
            PathCase::Sensitive
        }
    }

    fn eq(self, a: &OsStr, b: &OsStr) -> bool {
        match self {
            PathCase::Sensitive => a == b,
            PathCase::Insensitive => {
                a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
            }
        }
    }
}

impl Default for PathCase {
    fn default() -> Self {
        PathCase::native()
    }
}

/// What the namespace resolver needs to know about the owning project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    /// Directory containing the project file.
    pub root: PathBuf,
    /// Project name without the file extension, e.g. `Shop.Web`.
    pub name: String,
    /// Explicit default namespace, when the project declares one.
    pub default_namespace: Option<String>,
}

impl ProjectInfo {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        ProjectInfo {
            root: root.into(),
            name: name.into(),
            default_namespace: None,
        }
    }

    pub fn with_default_namespace(mut self, default_namespace: Option<String>) -> Self {
        self.default_namespace = default_namespace;
        self
    }

    /// The explicit default namespace, or the project name up to its last `.`.
    pub fn default_namespace(&self) -> String {
        if let Some(explicit) = &self.default_namespace {
            return explicit.clone();
        }
        match self.name.rfind('.') {
            Some(index) if index > 0 => self.name[..index].to_string(),
            _ => self.name.clone(),
        }
    }
}

/// Maps file locations to dotted namespaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamespaceResolver {
    case: PathCase,
}

impl NamespaceResolver {
    pub fn new(case: PathCase) -> Self {
        NamespaceResolver { case }
    }

    pub fn case(&self) -> PathCase {
        self.case
    }

    /// Resolves the namespace for `file_path` inside `project`.
    pub fn resolve(&self, project: &ProjectInfo, file_path: &Path) -> Result<String, Error> {
        let outside = || Error::OutsideProjectTree {
            path: file_path.to_path_buf(),
            root: project.root.clone(),
        };

        let directory: PathBuf = normal_components(file_path.parent().ok_or_else(outside)?)
            .into_iter()
            .collect();
        if !self.is_within(&project.root, &directory) {
            return Err(outside());
        }

        let mut segments = Vec::new();
        let mut current = directory.as_path();
        while !self.same_path(current, &project.root) {
            let name = current.file_name().ok_or_else(outside)?;
            segments.push(name.to_string_lossy().into_owned());
            current = current.parent().ok_or_else(outside)?;
        }
        segments.push(project.default_namespace());
        segments.reverse();

        let namespace = segments.join(".");
        tracing::debug!(file = %file_path.display(), namespace = %namespace, "resolved namespace");
        Ok(namespace)
    }

    /// Whether `path` equals `root` or is nested under it, component by component.
    pub fn is_within(&self, root: &Path, path: &Path) -> bool {
        let root = normal_components(root);
        let path = normal_components(path);
        path.len() >= root.len()
            && root
                .iter()
                .zip(path.iter())
                .all(|(a, b)| self.case.eq(a, b))
    }

    fn same_path(&self, a: &Path, b: &Path) -> bool {
        let a = normal_components(a);
        let b = normal_components(b);
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| self.case.eq(x, y))
    }
}

/// Components with `.` dropped and `..` folded into its parent, lexically.
fn normal_components(path: &Path) -> Vec<&OsStr> {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            _ => out.push(component),
        }
    }
    out.into_iter().map(Component::as_os_str).collect()
}
