//! The `plantgpt` binary: generate, browse and manage PlantUML diagrams.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chat_adapter::AgentKind;
use clap::{Parser, Subcommand};
use plantgpt::backends::{resolve_chat_model, resolve_renderer};
use plantgpt::download::{fetch_jar, http_client, PLANTUML_DOWNLOAD_URL};
use plantgpt::setup::{run_setup, SetupConfig};
use plantgpt::{generate, AppConfig, AppPaths, GenerateRequest, MethodologyLibrary, SchemeStore};
use plantuml_adapter::ImageFormat;
use repair::{ProgressEvent, RunOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a diagram from a prompt and store it under NAME
    Generate {
        /// Scheme file name (no extension)
        name: String,
        /// Prompt text
        #[arg(long, short, conflicts_with = "prompt_file")]
        prompt: Option<String>,
        /// Read the prompt from a file ("-" for stdin)
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        /// Methodology to apply
        #[arg(long, short)]
        methodology: Option<String>,
        /// Wrap the prompt in the invent-then-diagram template
        #[arg(long)]
        improve_prompt: bool,
        /// Attempt budget (overrides the configured value)
        #[arg(long)]
        max_retries: Option<usize>,
        /// Chat agent to use: claude, codex or opencode
        #[arg(long, value_parser = parse_backend)]
        backend: Option<AgentKind>,
        /// Render SVG instead of PNG
        #[arg(long)]
        svg: bool,
    },
    /// List stored schemes, newest first
    List,
    /// Print the diagram source of a stored scheme
    Show {
        /// Scheme id
        id: i64,
    },
    /// Write a scheme's source and image into a directory
    Export {
        /// Scheme id
        id: i64,
        /// Destination directory (default: current directory)
        #[arg(long, short, default_value = ".")]
        out: PathBuf,
    },
    /// Delete a scheme and its stored image
    Delete {
        /// Scheme id
        id: i64,
    },
    /// Manage methodologies
    Methodology {
        #[command(subcommand)]
        action: MethodologyAction,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Remove every file from the images directory
    CleanImages,
    /// Download plantuml.jar into the PlantUML directory and use it
    FetchJar {
        /// Release to download
        #[arg(long, default_value = PLANTUML_DOWNLOAD_URL)]
        url: String,
    },
    /// Create the application directory and check for PlantUML and chat agents
    Setup {
        /// Show what would be done without modifying files
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum MethodologyAction {
    /// List methodology names
    List,
    /// Create or replace a methodology
    Add {
        /// Methodology name
        name: String,
        /// Description text
        #[arg(long, short, conflicts_with = "file")]
        description: Option<String>,
        /// Read the description from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print a methodology
    Show {
        /// Methodology name
        name: String,
    },
    /// Delete a methodology
    Remove {
        /// Methodology name
        name: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set one key
    Set {
        /// Configuration key
        key: String,
        /// New value (empty string clears optional keys)
        value: String,
    },
    /// Restore defaults
    Reset,
}

fn parse_backend(s: &str) -> Result<AgentKind, String> {
    AgentKind::parse(s).ok_or_else(|| format!("unknown backend '{s}' (expected claude, codex or opencode)"))
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let paths = AppPaths::resolve()?;
    let mut config = AppConfig::load(&paths.config_file);

    match cli.command {
        Commands::Generate {
            name,
            prompt,
            prompt_file,
            methodology,
            improve_prompt,
            max_retries,
            backend,
            svg,
        } => {
            let prompt = read_prompt(prompt, prompt_file)?;
            if improve_prompt {
                config.improve_prompt = true;
            }
            if let Some(n) = max_retries {
                config.max_retries = n.max(1);
            }
            if let Some(kind) = backend {
                config.backend = kind;
            }
            if svg {
                config.image_format = ImageFormat::Svg;
            }
            let request = GenerateRequest {
                name,
                prompt,
                methodology,
            };
            run_generate(&request, &config, &paths).await?;
        }
        Commands::List => {
            let schemes = SchemeStore::open(paths.scheme_db())?.list().await?;
            if schemes.is_empty() {
                println!("No schemes stored yet.");
            }
            for scheme in schemes {
                println!("{}: {}", scheme.id, scheme.name);
            }
        }
        Commands::Show { id } => {
            let scheme = SchemeStore::open(paths.scheme_db())?.get(id).await?;
            println!("{}", scheme.code);
        }
        Commands::Export { id, out } => {
            let written = SchemeStore::open(paths.scheme_db())?.export(id, &out).await?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Delete { id } => {
            let scheme = SchemeStore::open(paths.scheme_db())?.delete(id).await?;
            println!("Deleted scheme {id} ({}).", scheme.name);
        }
        Commands::Methodology { action } => run_methodology(action, &paths)?,
        Commands::Config { action } => run_config(action, &mut config, &paths)?,
        Commands::CleanImages => {
            let removed = paths.clear_images()?;
            println!("Removed {removed} file(s) from {}.", paths.images_dir.display());
        }
        Commands::FetchJar { url } => {
            let jar = fetch_jar(&http_client()?, &url, &mut config, &paths, print_download_progress).await?;
            println!("\nSaved {} and set jar_path.", jar.display());
        }
        Commands::Setup { dry_run } => {
            run_setup(&SetupConfig { dry_run }, &paths, &config).await?;
        }
    }

    Ok(())
}

fn read_prompt(prompt: Option<String>, prompt_file: Option<PathBuf>) -> anyhow::Result<String> {
    match (prompt, prompt_file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) if path.as_os_str() == "-" => {
            std::io::read_to_string(std::io::stdin()).context("Could not read prompt from stdin")
        }
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read prompt file {}", path.display())),
        (None, None) => bail!("Provide the prompt with --prompt or --prompt-file"),
    }
}

async fn run_generate(request: &GenerateRequest, config: &AppConfig, paths: &AppPaths) -> anyhow::Result<()> {
    paths.ensure().context("Could not create application directories")?;
    let output_dir = config.output_dir(paths);
    plantgpt::generate::validate_request(request, &output_dir)?;

    let plantuml = resolve_renderer(config, paths)?;
    let model = Arc::new(resolve_chat_model(config, paths)?);
    let store = SchemeStore::open(paths.scheme_db())?;

    println!("Sending request to {}...", config.backend);
    let generation = generate(request, config, paths, model, plantuml, &store, print_progress).await?;
    let report = &generation.report;

    match &report.outcome {
        RunOutcome::Success { .. } => {
            let image = generation
                .stored_image
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string());
            println!("Diagram saved: {image} (attempts: {})", report.attempt_count());
            Ok(())
        }
        RunOutcome::ExhaustedRetries {
            attempts,
            last_diagnostic,
        } => bail!("Diagram still invalid after {attempts} attempts. Last PlantUML error:\n{last_diagnostic}"),
        RunOutcome::FatalError { kind, message } => bail!("Generation failed ({kind}):\n{message}"),
    }
}

fn print_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::Calling {
            attempt,
            max_attempts,
        } => println!("[{attempt}/{max_attempts}] Asking the model..."),
        ProgressEvent::Extracting { attempt } => println!("[{attempt}] Response received."),
        ProgressEvent::Rendering { attempt } => println!("[{attempt}] Rendering diagram..."),
        ProgressEvent::Classifying {
            attempt,
            diagnostic,
        } => println!("[{attempt}] PlantUML error:\n{diagnostic}"),
        ProgressEvent::Mutating { attempt, .. } => {
            println!("[{attempt}] Failed attempts: {attempt}. Asking the model to fix the code...");
        }
        ProgressEvent::Finished { .. } => {}
    }
}

fn print_download_progress(received: u64, total: Option<u64>) {
    match total {
        Some(total) if total > 0 => print!("\rDownloading plantuml.jar: {}%", received.saturating_mul(100) / total),
        _ => print!("\rDownloading plantuml.jar: {} KiB", received / 1024),
    }
    let _ = std::io::stdout().flush();
}

fn run_methodology(action: MethodologyAction, paths: &AppPaths) -> anyhow::Result<()> {
    let library = MethodologyLibrary::new(&paths.methodologies_dir);
    match action {
        MethodologyAction::List => {
            for name in library.list()? {
                println!("{name}");
            }
        }
        MethodologyAction::Add {
            name,
            description,
            file,
        } => {
            let description = match (description, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Could not read {}", path.display()))?,
                (None, None) => bail!("Provide the description with --description or --file"),
            };
            let stored = library.save(&name, &description)?;
            println!("Saved methodology '{stored}'.");
        }
        MethodologyAction::Show { name } => println!("{}", library.load(&name)?),
        MethodologyAction::Remove { name } => {
            library.remove(&name)?;
            println!("Removed methodology '{name}'.");
        }
    }
    Ok(())
}

fn run_config(action: ConfigAction, config: &mut AppConfig, paths: &AppPaths) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", paths.config_file.display());
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save(&paths.config_file)?;
            println!("Set {key}.");
        }
        ConfigAction::Reset => {
            *config = AppConfig::default();
            config.save(&paths.config_file)?;
            println!("Configuration reset to defaults.");
        }
    }
    Ok(())
}
