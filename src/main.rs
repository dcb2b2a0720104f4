//! Carver CLI
//!
//! Entry point for the `carver` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use carver::config::{CliOverrides, EffectiveConfig};
use carver::document::{write_path, DocumentError};
use carver::pipeline::{self, PipelineError, PipelineResult, RunReport};
use carver::{Group, Tree};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carver")]
#[command(about = "Factor shared configuration out of per-environment documents", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GroupArgs {
    /// Directory holding the group config and environment directories
    #[arg(long, short = 'c', default_value = ".")]
    config_dir: PathBuf,

    /// Normalized output directory (default: from config, `.carver`)
    #[arg(long, short = 'n')]
    normalized_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Factor values shared by every environment into the normalized tree
    Normalize {
        #[command(flatten)]
        group: GroupArgs,
    },

    /// Rebuild full environment documents from the normalized tree
    Merge {
        #[command(flatten)]
        group: GroupArgs,
    },

    /// Override-merge documents left to right
    Compose {
        /// Directory whose group config, if any, supplies the control key
        #[arg(long, short = 'c', default_value = ".")]
        config_dir: PathBuf,

        /// Reserved key carrying remove/replace directives (default: from config, `__`)
        #[arg(long)]
        control_key: Option<String>,

        /// Write the result here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Base document followed by overlays
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the structure and values shared by all documents
    Common {
        /// Write the result here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Documents to intersect
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
    },

    /// Print the keymap of one family as JSON
    Keymap {
        #[command(flatten)]
        group: GroupArgs,

        /// Inspect the normalized tree, common document included
        #[arg(long)]
        normalized: bool,

        /// Family key, e.g. `app.json`
        key: String,
    },

    /// Print the effective group configuration and where it came from
    Config {
        #[command(flatten)]
        group: GroupArgs,

        /// Reserved key carrying remove/replace directives
        #[arg(long)]
        control_key: Option<String>,
    },
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("carver=info,carver_core=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Commands) -> PipelineResult<()> {
    match command {
        Commands::Normalize { group } => {
            let config = load_config(&group)?;
            let source = Group::new(&config.config_dir, config.dirs().to_vec());
            let report = pipeline::normalize_tree(&source, config.normalized_dir())?;
            print_report("normalized", &report);
        }
        Commands::Merge { group } => {
            let config = load_config(&group)?;
            let source = Group::new(config.normalized_dir(), config.dirs().to_vec());
            let report = pipeline::merge_tree(&source, &config.config_dir)?;
            print_report("merged", &report);
        }
        Commands::Compose {
            config_dir,
            control_key,
            output,
            files,
        } => {
            let merger = pipeline::compose_merger(&config_dir, control_key)?;
            let tree = pipeline::compose_files(&files, &merger)?;
            emit(&tree, output.as_deref())?;
        }
        Commands::Common { output, files } => {
            let tree = pipeline::common_files(&files)?;
            emit(&tree, output.as_deref())?;
        }
        Commands::Keymap {
            group,
            normalized,
            key,
        } => {
            let config = load_config(&group)?;
            let root = if normalized {
                config.normalized_dir().to_path_buf()
            } else {
                config.config_dir.clone()
            };
            let keymap = pipeline::family_keymap(
                &Group::new(root, config.dirs().to_vec()),
                &key,
                normalized,
            )?;
            println!("{}", to_pretty_json(&keymap)?);
        }
        Commands::Config { group, control_key } => {
            let cli = CliOverrides {
                normalized_dir: group.normalized_dir.clone(),
                control_key,
            };
            let config = EffectiveConfig::build(&group.config_dir, &cli)?;
            println!("{}", config.to_json().map_err(stdout_json_error)?);
        }
    }
    Ok(())
}

fn load_config(args: &GroupArgs) -> PipelineResult<EffectiveConfig> {
    let cli = CliOverrides {
        normalized_dir: args.normalized_dir.clone(),
        ..CliOverrides::default()
    };
    Ok(EffectiveConfig::build(&args.config_dir, &cli)?)
}

fn print_report(action: &str, report: &RunReport) {
    for path in &report.written {
        println!("{}", path.display());
    }
    tracing::info!(
        families = report.families,
        files = report.written.len(),
        "{} group",
        action
    );
}

fn emit(tree: &Tree, output: Option<&Path>) -> PipelineResult<()> {
    match output {
        Some(path) => {
            write_path(path, tree)?;
            tracing::info!(path = %path.display(), "wrote document");
        }
        None => println!("{}", to_pretty_json(tree)?),
    }
    Ok(())
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> PipelineResult<String> {
    serde_json::to_string_pretty(value).map_err(stdout_json_error)
}

fn stdout_json_error(source: serde_json::Error) -> PipelineError {
    PipelineError::Document(DocumentError::Json {
        path: PathBuf::from("<stdout>"),
        source,
    })
}
