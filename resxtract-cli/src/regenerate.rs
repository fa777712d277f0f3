use std::path::{Path, PathBuf};
use std::process::Command;

use resxtract::{Error, Regenerator};

/// Placeholder replaced with the resource file path in each argument.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Runs a configured command after a resource file changed, e.g.
/// `["dotnet", "build", "--no-restore"]` or `["resgen", "{file}"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRegenerator {
    argv: Vec<String>,
    working_dir: PathBuf,
}

impl CommandRegenerator {
    pub fn new(argv: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            working_dir: working_dir.into(),
        }
    }

    fn arguments_for(&self, resource_file: &Path) -> Vec<String> {
        let file = resource_file.display().to_string();
        self.argv
            .iter()
            .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
            .collect()
    }
}

impl Regenerator for CommandRegenerator {
    fn regenerate(&self, resource_file: &Path) -> Result<(), Error> {
        let argv = self.arguments_for(resource_file);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::host("regenerate command is empty"))?;

        tracing::info!(program = %program, file = %resource_file.display(), "regenerating accessor");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|e| Error::host(format!("cannot run `{}`: {}", program, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::host(format!(
                "`{}` exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )))
        }
    }
}
