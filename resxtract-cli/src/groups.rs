use std::path::Path;

use resxtract::{GroupSummary, ResourceGroup, discover_groups};
use resxtract_cli::FsProject;

fn display_relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Ok(relative) => relative.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

pub fn load_groups(project: &FsProject) -> Result<Vec<ResourceGroup>, String> {
    discover_groups(project).map_err(|e| format!("Error discovering resource files: {}", e))
}

pub fn run_groups_command(project: &FsProject, json_output: bool) -> Result<(), String> {
    let groups = load_groups(project)?;

    if json_output {
        let summaries: Vec<GroupSummary> = groups.iter().map(ResourceGroup::summary).collect();
        let out = serde_json::to_string_pretty(&summaries)
            .map_err(|e| format!("Error serializing groups: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No resource groups found in {}", project.root().display());
        return Ok(());
    }
    for group in &groups {
        println!(
            "{} ({})",
            display_relative(project.root(), group.folder()),
            group.accessor_name().unwrap_or_default()
        );
        for store in group.stores() {
            println!(
                "  {:<10} {}",
                store.culture().name(),
                display_relative(project.root(), store.path())
            );
        }
    }
    Ok(())
}

/// Picks the group in `folder`, or the only group when no folder is given.
pub fn select_group<'a>(
    project: &FsProject,
    groups: &'a [ResourceGroup],
    folder: Option<&Path>,
) -> Result<&'a ResourceGroup, String> {
    if groups.is_empty() {
        return Err(resxtract::Error::NoResourceStores.to_string());
    }

    match folder {
        Some(folder) => {
            let wanted = if folder.is_absolute() {
                folder.to_path_buf()
            } else {
                project.root().join(folder)
            };
            let wanted = project.absolute(&wanted)?;
            groups
                .iter()
                .find(|g| g.folder() == wanted)
                .ok_or_else(|| format!("No resource group in {}", folder.display()))
        }
        None if groups.len() == 1 => Ok(&groups[0]),
        None => {
            let folders: Vec<String> = groups
                .iter()
                .map(|g| display_relative(project.root(), g.folder()))
                .collect();
            Err(format!(
                "Several resource groups found; pick one with --group: {}",
                folders.join(", ")
            ))
        }
    }
}
