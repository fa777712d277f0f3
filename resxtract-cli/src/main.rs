mod externalize;
mod groups;
mod keys;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use resxtract::Span;
use resxtract_cli::{Selection, open_project, parse_span};

use crate::externalize::{ExternalizeArgs, parse_text, run_externalize_command};
use crate::groups::run_groups_command;
use crate::keys::{run_check_key_command, run_namespace_command, run_suggest_key_command};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project directory (containing the .csproj)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Configuration file (defaults to resxtract.toml in the project directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log what is being done to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List resource groups (folders of .resx culture variants).
    Groups {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a key is a valid identifier and not yet used in a group.
    CheckKey {
        key: String,

        /// Folder of the resource group (needed when there are several)
        #[arg(short, long)]
        group: Option<PathBuf>,
    },

    /// Print the namespace inferred for a file from its folder.
    Namespace { file: PathBuf },

    /// Derive a resource key from a piece of text.
    SuggestKey { text: String },

    /// Move a selected string into the resource files and reference it.
    Externalize {
        /// The C# or XAML file to edit
        file: PathBuf,

        /// Selection as byte offsets START..END
        #[arg(long, value_parser = parse_span, conflicts_with = "find", required_unless_present = "find")]
        span: Option<Span>,

        /// Select the first occurrence of this text
        #[arg(long)]
        find: Option<String>,

        /// Resource key (derived from the selected text when omitted)
        #[arg(short, long)]
        key: Option<String>,

        /// Folder of the resource group (needed when there are several)
        #[arg(short, long)]
        group: Option<PathBuf>,

        /// Text for one culture, e.g. --text ru=Привет (repeatable)
        #[arg(long = "text", value_parser = parse_text)]
        texts: Vec<(String, String)>,

        /// Comment for the neutral entry
        #[arg(long)]
        comment: Option<String>,

        /// Output the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

fn run(args: Args) -> Result<(), String> {
    if let Commands::SuggestKey { text } = &args.commands {
        return run_suggest_key_command(text);
    }

    let (config, project) = open_project(&args.project, args.config.as_deref())?;
    match args.commands {
        Commands::Groups { json } => run_groups_command(&project, json),
        Commands::CheckKey { key, group } => run_check_key_command(&project, &key, group),
        Commands::Namespace { file } => run_namespace_command(&config, &project, &file),
        Commands::SuggestKey { text } => run_suggest_key_command(&text),
        Commands::Externalize {
            file,
            span,
            find,
            key,
            group,
            texts,
            comment,
            json,
        } => {
            let selection = match (span, find) {
                (Some(span), _) => Selection::Span(span),
                (None, Some(text)) => Selection::Find(text),
                (None, None) => return Err("either --span or --find is required".to_string()),
            };
            run_externalize_command(
                &config,
                &project,
                ExternalizeArgs {
                    file,
                    selection,
                    key,
                    group,
                    texts,
                    comment,
                    json,
                },
            )
        }
    }
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
