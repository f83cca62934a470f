//! RBAC check tool
//!
//! Loads a seed into the in-memory permission store and answers questions
//! against it through the authorization engine.
//!
//! ```text
//! rbac-check --seed seed.toml check --role alice --permission SELECT --resource data/shop/orders
//! rbac-check --seed seed.toml roles
//! rbac-check --config rbac.toml watch
//! ```
//!
//! `RUST_LOG` overrides the configured log level.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cretoai_rbac::{
    AuthorizationEngine, InMemoryPermissionStore, Permission, RbacConfig, Resource, Seed,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// CretoAI RBAC check CLI
#[derive(Parser)]
#[command(name = "rbac-check")]
#[command(about = "Evaluate role-based permissions against a seeded permission store")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "RBAC_CONFIG")]
    config: Option<PathBuf>,

    /// Seed file (overrides store.seed from the configuration)
    #[arg(short, long, env = "RBAC_SEED")]
    seed: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a single permission
    Check {
        /// Role performing the action
        #[arg(short, long)]
        role: String,

        /// Permission, e.g. SELECT or ALL
        #[arg(short, long)]
        permission: String,

        /// Resource, e.g. data, data/ks, data/ks/table, roles, roles/name
        #[arg(long)]
        resource: String,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// List roles with their flags and effective roles
    Roles,

    /// Run the refresh loop until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RbacConfig::load(path).context("Failed to load configuration")?,
        None => RbacConfig::default(),
    };
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_ascii_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},cretoai_rbac={}", log_level, log_level).into()),
        )
        .with_target(false)
        .init();

    let seed_path = match cli.seed.clone().or_else(|| config.store.seed.clone()) {
        Some(path) => path,
        None => bail!("No seed file given; pass --seed or set store.seed in the configuration"),
    };

    let seed = Seed::load(&seed_path)
        .with_context(|| format!("Failed to load seed {}", seed_path.display()))?;
    let store = InMemoryPermissionStore::from_seed(seed)
        .await
        .context("Seed rejected by permission store")?;

    let engine = AuthorizationEngine::start(config.engine(), Arc::new(store))
        .await
        .context("Failed to load initial permission snapshot")?;

    match cli.command {
        Command::Check {
            role,
            permission,
            resource,
            json,
        } => run_check(&engine, &role, &permission, &resource, json),
        Command::Roles => run_roles(&engine),
        Command::Watch => run_watch(&engine).await,
    }
}

fn run_check(
    engine: &AuthorizationEngine,
    role: &str,
    permission: &str,
    resource: &str,
    json: bool,
) -> Result<()> {
    let permission: Permission = permission.parse().context("Invalid permission")?;
    let resource: Resource = resource.parse().context("Invalid resource")?;

    let principal = engine
        .principal(role)
        .unwrap_or_else(|| cretoai_rbac::Role::new(role));
    let decision = engine.explain(&principal, permission, &resource);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!("{} {} on {}: {}", principal.name, permission, resource, decision);
    }

    if !decision.is_allowed() {
        std::process::exit(1);
    }

    Ok(())
}

fn run_roles(engine: &AuthorizationEngine) -> Result<()> {
    let state = engine.cache().load();
    let mut names: Vec<&String> = state.snapshot().roles.keys().collect();
    names.sort();

    println!("snapshot version {}", state.version());
    for name in names {
        let Some(role) = state.role(name) else {
            continue;
        };

        let mut flags = Vec::new();
        if role.is_superuser {
            flags.push("superuser");
        }
        if role.can_login {
            flags.push("login");
        }

        let inherited: Vec<&str> = state.effective_roles(name).into_iter().skip(1).collect();
        println!(
            "{:<20} [{}] member of: {}",
            name,
            flags.join(","),
            if inherited.is_empty() {
                "-".to_string()
            } else {
                inherited.join(", ")
            }
        );
    }

    Ok(())
}

async fn run_watch(engine: &AuthorizationEngine) -> Result<()> {
    let handle = engine.spawn_refresh();
    info!(version = engine.snapshot_version(), "Watching permission store");

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(10));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let metrics = engine.metrics();
                info!(
                    version = metrics.installed_version,
                    refresh_successes = metrics.refresh_successes,
                    refresh_failures = metrics.refresh_failures,
                    "Refresh status"
                );
            }
        }
    }

    handle.shutdown().await;
    print!("{}", engine.export_prometheus());

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}
