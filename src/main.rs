//! tagbind CLI - parse component snippets and bind them onto a document

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;

use tagbind::config::CONFIG_ENV;
use tagbind::{detect, parse_component, BindError, BindRequest, Config, FixSuggestion, MemoryHost, Orchestrator};

#[derive(Parser)]
#[command(name = "tagbind")]
#[command(about = "tagbind - bind pseudo-JSX component snippets onto design components")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a snippet and print its properties as JSON
    Parse {
        /// Snippet file (stdin when omitted)
        file: Option<PathBuf>,

        /// Component type (auto-detected when omitted)
        #[arg(short, long)]
        component: Option<String>,

        /// Config file (defaults to $TAGBIND_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the component type detected in a snippet
    Detect {
        /// Snippet file (stdin when omitted)
        file: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Bind a snippet onto a document described in YAML
    Bind {
        /// Snippet file (stdin when omitted)
        file: Option<PathBuf>,

        /// Document YAML (components, properties, layers)
        #[arg(short, long)]
        document: PathBuf,

        #[arg(short, long)]
        component: Option<String>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Dump the invocation event log to stderr
        #[arg(long)]
        events: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { file, component, config } => parse(file.as_deref(), component, config.as_deref()),
        Commands::Detect { file, config } => detect_type(file.as_deref(), config.as_deref()),
        Commands::Bind {
            file,
            document,
            component,
            config,
            json,
            events,
        } => {
            let output = BindOutput { json, events };
            run_bind(file.as_deref(), &document, component, config.as_deref(), output).await
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.downcast_ref::<BindError>().and_then(|b| b.fix_suggestion()) {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
        }
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            Ok(input)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    match path.map(Path::to_path_buf).or(from_env) {
        Some(path) => Ok(Config::load(&path)?),
        None => Ok(Config::default()),
    }
}

fn parse(file: Option<&Path>, component: Option<String>, config: Option<&Path>) -> anyhow::Result<bool> {
    let markup = read_input(file)?;
    if markup.trim().is_empty() {
        return Err(BindError::EmptyMarkup.into());
    }
    let config = load_config(config)?;

    let profile = match component {
        Some(name) => config.profile(&name)?,
        None => detect(&markup, &config.profiles())
            .cloned()
            .ok_or(BindError::MissingComponentType)?,
    };

    let bag = parse_component(&markup, &profile).ok_or_else(|| BindError::TagNotFound {
        tag: profile.tag_name(),
        example: profile.example_snippet(),
    })?;

    println!("{}", bag.to_pretty_json());
    Ok(true)
}

fn detect_type(file: Option<&Path>, config: Option<&Path>) -> anyhow::Result<bool> {
    let markup = read_input(file)?;
    let config = load_config(config)?;

    match detect(&markup, &config.profiles()) {
        Some(profile) => {
            println!("{}", profile.name);
            Ok(true)
        }
        None => {
            eprintln!("{} no known component tag found", "✗".red());
            Ok(false)
        }
    }
}

struct BindOutput {
    json: bool,
    events: bool,
}

async fn run_bind(
    file: Option<&Path>,
    document: &Path,
    component: Option<String>,
    config: Option<&Path>,
    output: BindOutput,
) -> anyhow::Result<bool> {
    let markup = read_input(file)?;
    let config = load_config(config)?;

    let yaml = tokio::fs::read_to_string(document)
        .await
        .with_context(|| format!("failed to read document '{}'", document.display()))?;
    let host = MemoryHost::from_yaml(&yaml)?;

    let orchestrator = Orchestrator::new(config)?;
    let request = BindRequest::new(markup, component.unwrap_or_default());
    let report = orchestrator.run(&host, &request).await;

    if output.events {
        eprintln!("{}", serde_json::to_string_pretty(&report.events.to_json())?);
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.completed {
        println!("{} {}", "✓".green(), report.status);
    } else {
        eprintln!("{} {}", "✗".red(), report.status);
    }

    Ok(report.completed)
}
