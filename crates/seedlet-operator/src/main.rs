//! Seedlet Operator - installs extension controllers onto seeds

mod controller_runner;
mod identity;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use seedlet_common::crd::all_crds;
use seedlet_common::kube_utils::create_client;

/// Seedlet - renders extension charts and installs them onto seeds
#[derive(Parser, Debug)]
#[command(name = "seedlet", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches ControllerInstallations in the garden and installs or removes
    /// the referenced extension charts on the target seed.
    Controller(ControllerArgs),
}

#[derive(clap::Args, Debug, Default)]
struct ControllerArgs {
    /// Kubeconfig of the garden cluster (inferred if unset)
    #[arg(long, env = "GARDEN_KUBECONFIG")]
    garden_kubeconfig: Option<PathBuf>,

    /// Kubeconfig of the seed cluster (inferred if unset)
    #[arg(long, env = "SEED_KUBECONFIG")]
    seed_kubeconfig: Option<PathBuf>,

    /// Cluster identity of the garden; read from the garden's
    /// kube-system/cluster-identity ConfigMap if unset
    #[arg(long, env = "GARDEN_CLUSTER_IDENTITY")]
    garden_cluster_identity: Option<String>,

    /// Only reconcile installations targeting this seed
    #[arg(long, env = "SEED_NAME")]
    seed_name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        for crd in all_crds() {
            let yaml = serde_yaml::to_string(&crd)
                .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("---\n{yaml}");
        }
        return Ok(());
    }

    match cli.command {
        Some(Commands::Controller(args)) => run_controller(args).await,
        None => run_controller(ControllerArgs::default()).await,
    }
}

async fn run_controller(args: ControllerArgs) -> anyhow::Result<()> {
    tracing::info!("Seedlet controller starting...");

    let garden = create_client(args.garden_kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create garden client: {}", e))?;
    let seed = create_client(args.seed_kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create seed client: {}", e))?;

    let identity = identity::discover(&garden, args.garden_cluster_identity)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to discover garden identity: {}", e))?;
    tracing::info!(
        version = %identity.version,
        garden = %identity.garden_cluster_identity,
        "Discovered control plane identity"
    );

    tracing::info!("Starting controllers:");
    controller_runner::build_installation_controller(garden, seed, identity, args.seed_name).await;

    tracing::info!("Seedlet controller shutting down");
    Ok(())
}
