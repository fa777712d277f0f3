use std::path::PathBuf;

use resxtract::culture::parse_culture_tag;
use resxtract::{
    DocumentHost, ExternalizeRequest, Externalizer, NoRegeneration, Outcome, Regenerator,
    neutral_comment, suggest_key,
};
use resxtract_cli::{CommandRegenerator, Config, FsDocumentHost, FsProject, Selection};

use crate::groups::{load_groups, select_group};

const NEUTRAL: &str = "neutral";

#[derive(Debug, Clone)]
pub struct ExternalizeArgs {
    pub file: PathBuf,
    pub selection: Selection,
    pub key: Option<String>,
    pub group: Option<PathBuf>,
    pub texts: Vec<(String, String)>,
    pub comment: Option<String>,
    pub json: bool,
}

/// Parses `CULTURE=TEXT`.
pub fn parse_text(value: &str) -> Result<(String, String), String> {
    let (culture, text) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CULTURE=TEXT, got '{}'", value))?;
    let culture = culture.trim();
    if culture.eq_ignore_ascii_case(NEUTRAL) {
        return Ok((NEUTRAL.to_string(), text.to_string()));
    }
    let tag = parse_culture_tag(culture).ok_or_else(|| format!("unknown culture '{}'", culture))?;
    Ok((tag.to_string(), text.to_string()))
}

pub fn run_externalize_command(
    config: &Config,
    project: &FsProject,
    args: ExternalizeArgs,
) -> Result<(), String> {
    let document = project.absolute(&args.file)?;
    let host = FsDocumentHost::new(&document, args.selection);

    let groups = load_groups(project)?;
    let group = select_group(project, &groups, args.group.as_deref())?;

    let key = match args.key {
        Some(key) => key,
        None => {
            let snapshot = host.snapshot(&document).map_err(|e| e.to_string())?;
            let selected = snapshot.selected_text().map_err(|e| e.to_string())?;
            let key = suggest_key(selected);
            if key.is_empty() {
                return Err("Cannot derive a key from the selection; pass --key".to_string());
            }
            tracing::info!(key = %key, "using suggested key");
            key
        }
    };

    let comment = args
        .comment
        .or_else(|| Some(neutral_comment(&document, project.root())));
    let mut request = ExternalizeRequest::new(&document, group, &key).with_comment(comment);
    for (culture, text) in args.texts {
        if !group.stores().iter().any(|s| s.culture().name() == culture) {
            tracing::warn!("no {} resource file in {}", culture, group.description());
        }
        request = request.with_translation(culture, text);
    }

    let regenerator: Box<dyn Regenerator> = match &config.regenerate {
        Some(argv) => Box::new(CommandRegenerator::new(argv.clone(), project.root())),
        None => Box::new(NoRegeneration),
    };
    let outcome = Externalizer::new(config.externalizer_settings()).externalize(
        &host,
        regenerator.as_ref(),
        &request,
    );

    if args.json {
        let out = serde_json::to_string_pretty(&outcome)
            .map_err(|e| format!("Error serializing outcome: {}", e))?;
        println!("{}", out);
    }
    match outcome {
        Outcome::Success { message, warning } => {
            if !args.json {
                println!("{}", message);
            }
            if let Some(warning) = warning {
                eprintln!("Warning: {}", warning);
            }
            Ok(())
        }
        Outcome::Failure { message } => Err(message),
    }
}
