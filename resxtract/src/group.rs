//! Resource groups: the culture variants of one logical string table.
//!
//! All `.resx` files in one folder form a group. Each file is classified by
//! culture; files that are not culture files are skipped and only the first
//! neutral file is kept. Duplicate culture tags are both kept.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    culture::{self, Culture},
    error::Error,
    host::ProjectModel,
    namespace::{NamespaceResolver, ProjectInfo},
    store::ResourceStore,
};

/// The extension of resource store files.
pub const RESOURCE_EXTENSION: &str = "resx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroup {
    folder: PathBuf,
    project: ProjectInfo,
    stores: Vec<ResourceStore>,
}

impl ResourceGroup {
    /// Builds a group from candidate files that share `folder`.
    pub fn new<I, P>(folder: impl Into<PathBuf>, project: ProjectInfo, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let folder = folder.into();
        let mut stores: Vec<ResourceStore> = Vec::new();

        for file in files {
            let file = file.as_ref();
            let culture = match culture::classify_path(file) {
                Ok(culture) => culture,
                Err(e) => {
                    tracing::debug!(file = %file.display(), "skipping: {e}");
                    continue;
                }
            };
            if culture.is_neutral() && stores.iter().any(ResourceStore::is_neutral) {
                tracing::warn!(
                    file = %file.display(),
                    "skipping second neutral resource file in {}",
                    folder.display()
                );
                continue;
            }
            stores.push(ResourceStore::new(file, culture));
        }

        ResourceGroup {
            folder,
            project,
            stores,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn stores(&self) -> &[ResourceStore] {
        &self.stores
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn neutral(&self) -> Option<&ResourceStore> {
        self.stores.iter().find(|s| s.is_neutral())
    }

    /// Stores with the given culture, in discovery order.
    pub fn stores_for(&self, culture: &Culture) -> impl Iterator<Item = &ResourceStore> {
        self.stores.iter().filter(move |s| s.culture() == culture)
    }

    /// The neutral store, or the first store when there is no neutral one.
    pub fn representative(&self) -> Option<&ResourceStore> {
        self.neutral().or_else(|| self.stores.first())
    }

    /// Stores ordered for translation entry: neutral first, then the rest.
    pub fn stores_neutral_first(&self) -> Vec<&ResourceStore> {
        let mut ordered: Vec<&ResourceStore> = self.stores.iter().collect();
        ordered.sort_by_key(|s| !s.is_neutral());
        ordered
    }

    /// Whether any member store already defines `name`.
    pub fn exists_key(&self, name: &str) -> Result<bool, Error> {
        for store in &self.stores {
            if store.exists_key(name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Namespace of the generated accessor, derived from the representative store.
    pub fn resolve_namespace(&self, resolver: &NamespaceResolver) -> Result<String, Error> {
        let store = self.representative().ok_or(Error::NoResourceStores)?;
        resolver.resolve(&self.project, store.path())
    }

    /// Name of the generated accessor class, e.g. `Strings` for `Strings.resx`.
    pub fn accessor_name(&self) -> Option<String> {
        self.representative().map(|store| {
            let base_name = store.base_name();
            if store.is_neutral() {
                base_name
            } else {
                culture::strip_culture(&base_name).to_string()
            }
        })
    }

    /// `"neutral, ru (folder)"`.
    pub fn description(&self) -> String {
        let cultures = self
            .stores
            .iter()
            .map(|s| s.culture().name())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} ({})", cultures, self.folder.display())
    }

    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            folder: self.folder.clone(),
            accessor: self.accessor_name(),
            stores: self
                .stores
                .iter()
                .map(|s| StoreSummary {
                    path: s.path().to_path_buf(),
                    culture: s.culture().name(),
                })
                .collect(),
        }
    }
}

/// Serializable view of a group, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub folder: PathBuf,
    pub accessor: Option<String>,
    pub stores: Vec<StoreSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub path: PathBuf,
    pub culture: String,
}

/// Enumerates the project's `.resx` files and groups them by folder.
///
/// Groups keep the order in which their folders were first seen; folders
/// whose files are all rejected produce no group.
pub fn discover_groups<M: ProjectModel + ?Sized>(project: &M) -> Result<Vec<ResourceGroup>, Error> {
    let info = project.info();
    let mut folders: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();

    for file in project.files_with_extension(RESOURCE_EXTENSION)? {
        let folder = file.parent().map(Path::to_path_buf).unwrap_or_default();
        match folders.iter_mut().find(|(f, _)| *f == folder) {
            Some((_, files)) => files.push(file),
            None => folders.push((folder, vec![file])),
        }
    }

    let groups: Vec<ResourceGroup> = folders
        .into_iter()
        .map(|(folder, files)| ResourceGroup::new(folder, info.clone(), files))
        .filter(|group| !group.is_empty())
        .collect();

    tracing::debug!(count = groups.len(), "discovered resource groups");
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::PathCase;
    use std::fs;

    const EMPTY: &str = "<root>\n</root>\n";

    fn project(root: &Path) -> ProjectInfo {
        ProjectInfo::new(root, "App")
    }

    struct FakeProject {
        info: ProjectInfo,
        files: Vec<PathBuf>,
    }

    impl ProjectModel for FakeProject {
        fn info(&self) -> ProjectInfo {
            self.info.clone()
        }

        fn files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>, Error> {
            Ok(self
                .files
                .iter()
                .filter(|f| f.extension().and_then(|e| e.to_str()) == Some(extension))
                .cloned()
                .collect())
        }
    }

    #[test]
    fn test_first_neutral_wins() {
        let group = ResourceGroup::new(
            "/P/Props",
            project(Path::new("/P")),
            ["/P/Props/Strings.resx", "/P/Props/Other.resx", "/P/Props/Strings.ru.resx"],
        );
        let neutral: Vec<_> = group.stores().iter().filter(|s| s.is_neutral()).collect();
        assert_eq!(neutral.len(), 1);
        assert_eq!(neutral[0].path(), Path::new("/P/Props/Strings.resx"));
        assert_eq!(group.stores().len(), 2);
    }

    #[test]
    fn test_invalid_cultures_are_skipped_and_duplicates_kept() {
        let group = ResourceGroup::new(
            "/P",
            project(Path::new("/P")),
            [
                "/P/Strings.Designer.resx",
                "/P/Strings.de.resx",
                "/P/Other.de.resx",
            ],
        );
        let names: Vec<_> = group.stores().iter().map(|s| s.culture().name()).collect();
        assert_eq!(names, ["de", "de"]);
        let de: Culture = Culture::Tag("de".parse().unwrap());
        assert_eq!(group.stores_for(&de).count(), 2);
    }

    #[test]
    fn test_representative_and_accessor() {
        let group = ResourceGroup::new(
            "/P",
            project(Path::new("/P")),
            ["/P/Strings.ru.resx", "/P/Strings.resx"],
        );
        assert_eq!(
            group.representative().unwrap().path(),
            Path::new("/P/Strings.resx")
        );
        assert_eq!(group.accessor_name().as_deref(), Some("Strings"));
        assert_eq!(group.description(), "ru, neutral (/P)");
        let ordered: Vec<_> = group
            .stores_neutral_first()
            .iter()
            .map(|s| s.culture().name())
            .collect();
        assert_eq!(ordered, ["neutral", "ru"]);

        let no_neutral = ResourceGroup::new("/P", project(Path::new("/P")), ["/P/Strings.ru.resx"]);
        assert_eq!(no_neutral.accessor_name().as_deref(), Some("Strings"));
    }

    #[test]
    fn test_exists_key_is_or_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let neutral = dir.path().join("Strings.resx");
        let ru = dir.path().join("Strings.ru.resx");
        fs::write(&neutral, EMPTY).unwrap();
        fs::write(
            &ru,
            "<root>\n  <data name=\"OnlyRu\"><value>x</value></data>\n</root>\n",
        )
        .unwrap();

        let group = ResourceGroup::new(dir.path(), project(dir.path()), [&neutral, &ru]);
        assert!(group.exists_key("OnlyRu").unwrap());
        assert!(!group.exists_key("Missing").unwrap());
    }

    #[test]
    fn test_resolve_namespace_uses_representative() {
        let group = ResourceGroup::new(
            "/P/Properties",
            project(Path::new("/P")),
            ["/P/Properties/Strings.resx"],
        );
        let resolver = NamespaceResolver::new(PathCase::Sensitive);
        assert_eq!(group.resolve_namespace(&resolver).unwrap(), "App.Properties");

        let empty = ResourceGroup::new("/P", project(Path::new("/P")), Vec::<PathBuf>::new());
        assert!(matches!(
            empty.resolve_namespace(&resolver),
            Err(Error::NoResourceStores)
        ));
    }

    #[test]
    fn test_discover_groups_by_folder() {
        let model = FakeProject {
            info: project(Path::new("/P")),
            files: vec![
                PathBuf::from("/P/B/Strings.resx"),
                PathBuf::from("/P/A/Strings.resx"),
                PathBuf::from("/P/B/Strings.fr.resx"),
                PathBuf::from("/P/C/Strings.Designer.resx"),
                PathBuf::from("/P/B/Code.cs"),
            ],
        };
        let groups = discover_groups(&model).unwrap();
        let folders: Vec<_> = groups.iter().map(|g| g.folder().to_path_buf()).collect();
        assert_eq!(folders, [PathBuf::from("/P/B"), PathBuf::from("/P/A")]);
        assert_eq!(groups[0].stores().len(), 2);
    }

    #[test]
    fn test_summary_serializes() {
        let group = ResourceGroup::new("/P", project(Path::new("/P")), ["/P/Strings.resx"]);
        let summary = group.summary();
        assert_eq!(summary.accessor.as_deref(), Some("Strings"));
        assert_eq!(summary.stores[0].culture, "neutral");
    }
}
