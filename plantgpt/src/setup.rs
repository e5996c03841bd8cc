use anyhow::Context;

use chat_adapter::{AgentCli, AgentKind};
use plantuml_adapter::{PlantUml, RenderConfig};

use crate::config::{AppConfig, AppPaths};

/// Configuration for the setup process.
pub struct SetupConfig {
    /// Whether to run in dry-run mode (no changes applied).
    pub dry_run: bool,
}

/// Prepares the application directory and reports which tools are available.
///
/// # Errors
/// Returns an error if directories or the default configuration cannot be written.
pub async fn run_setup(setup: &SetupConfig, paths: &AppPaths, config: &AppConfig) -> anyhow::Result<()> {
    tracing::info!(event = "setup_started", root = %paths.root.display(), "setup_started");

    println!("Application directory: {}", paths.root.display());
    if setup.dry_run {
        println!("[DRY RUN] Would create DB, Images, Methodologies and PlantUML directories");
    } else {
        paths
            .ensure()
            .with_context(|| format!("Could not create {}", paths.root.display()))?;
        println!("[OK] Directories ready.");
    }

    if paths.config_file.exists() {
        println!("[SKIP] {} already exists.", paths.config_file.display());
    } else if setup.dry_run {
        println!("[DRY RUN] Would write default {}", paths.config_file.display());
    } else {
        config
            .save(&paths.config_file)
            .context("Could not write default configuration")?;
        println!("[OK] Wrote {}", paths.config_file.display());
    }

    check_renderer(config, paths).await;
    check_agents(config.backend).await;

    if setup.dry_run {
        println!("\n[DRY RUN] Setup complete. No files were modified.");
    } else {
        println!("\n[SUCCESS] PlantGPT is set up.");
    }
    Ok(())
}

async fn check_renderer(config: &AppConfig, paths: &AppPaths) {
    match PlantUml::discover(config.jar(paths), config.java_path.clone()) {
        Ok(plantuml) => match plantuml.version(&RenderConfig::default()).await {
            Ok(version) => println!("[OK] PlantUML: {version}"),
            Err(e) => println!("[WARN] PlantUML found but did not run: {e}"),
        },
        Err(e) => {
            println!("[MISSING] {e}");
            println!(
                "          Run `plantgpt fetch-jar`, place plantuml.jar at {}, or run `plantgpt config set jar_path <path>`.",
                paths.default_jar().display()
            );
        }
    }
}

async fn check_agents(selected: AgentKind) {
    for kind in [AgentKind::Claude, AgentKind::Codex, AgentKind::OpenCode] {
        let marker = if kind == selected { " (selected)" } else { "" };
        match AgentCli::discover(kind, None) {
            Ok(agent) => match agent.check_health().await {
                Ok(()) => println!("[OK] {kind}{marker}: {}", agent.path.display()),
                Err(e) => println!("[WARN] {kind}{marker} found but unhealthy: {e}"),
            },
            Err(_) => println!("[MISSING] {kind}{marker}: install with `{}`", kind.install_hint()),
        }
    }
}
