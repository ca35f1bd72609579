//! ObjectSet Operator - remote phase reconciliation for package deployments

use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use objectset_operator::config::ControllerConfig;
use objectset_operator::controller::{error_policy, reconcile, Context};
use objectset_operator::crd::{ClusterObjectSet, ClusterObjectSetPhase, ObjectSet, ObjectSetPhase};
use objectset_operator::FIELD_MANAGER;

/// ObjectSet Operator - reconciles ObjectSets and their remote phases
#[derive(Parser, Debug)]
#[command(name = "objectset-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches ObjectSets and ClusterObjectSets and keeps an ObjectSetPhase
    /// in place for every phase that carries a class.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        println!("{}", crd_manifests()?);
        return Ok(());
    }

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

/// All CRDs as a multi-document YAML stream
fn crd_manifests() -> anyhow::Result<String> {
    let docs = [
        serde_yaml::to_string(&ObjectSet::crd()),
        serde_yaml::to_string(&ClusterObjectSet::crd()),
        serde_yaml::to_string(&ObjectSetPhase::crd()),
        serde_yaml::to_string(&ClusterObjectSetPhase::crd()),
    ]
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
    Ok(docs.join("---\n"))
}

/// Ensure all ObjectSet CRDs are installed
///
/// The operator installs its own CRDs on startup using server-side apply, so
/// the CRD versions always match the operator version.
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for crd in [
        ObjectSet::crd(),
        ClusterObjectSet::crd(),
        ObjectSetPhase::crd(),
        ClusterObjectSetPhase::crd(),
    ] {
        let name = crd.metadata.name.clone().unwrap_or_default();
        tracing::info!(crd = %name, "Installing CRD");
        crds.patch(&name, &params, &Patch::Apply(&crd))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to install CRD {}: {}", name, e))?;
    }

    tracing::info!("All ObjectSet CRDs installed/updated");
    Ok(())
}

/// Run the ObjectSet and ClusterObjectSet controllers until shutdown
async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    ensure_crds_installed(&client).await?;

    let (object_sets, phases): (Api<ObjectSet>, Api<ObjectSetPhase>) =
        match config.watch_namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
            ),
            None => (Api::all(client.clone()), Api::all(client.clone())),
        };
    let cluster_object_sets: Api<ClusterObjectSet> = Api::all(client.clone());
    let cluster_phases: Api<ClusterObjectSetPhase> = Api::all(client.clone());

    let ctx = Arc::new(Context::new(client, config.clone()));

    tracing::info!(
        watch_namespace = ?config.watch_namespace,
        requeue_interval_secs = config.requeue_interval_secs,
        "Starting ObjectSet controllers"
    );

    let object_set_controller = Controller::new(object_sets, WatcherConfig::default())
        .owns(phases, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile::<ObjectSet>, error_policy::<ObjectSet>, ctx.clone())
        .for_each(|result| async move {
            match result {
                Ok(action) => {
                    tracing::debug!(?action, "ObjectSet reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "ObjectSet reconciliation error");
                }
            }
        });

    let cluster_object_set_controller =
        Controller::new(cluster_object_sets, WatcherConfig::default())
            .owns(cluster_phases, WatcherConfig::default())
            .shutdown_on_signal()
            .run(
                reconcile::<ClusterObjectSet>,
                error_policy::<ClusterObjectSet>,
                ctx.clone(),
            )
            .for_each(|result| async move {
                match result {
                    Ok(action) => {
                        tracing::debug!(?action, "ClusterObjectSet reconciliation completed");
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "ClusterObjectSet reconciliation error");
                    }
                }
            });

    tokio::select! {
        _ = object_set_controller => {
            tracing::info!("ObjectSet controller completed");
        }
        _ = cluster_object_set_controller => {
            tracing::info!("ClusterObjectSet controller completed");
        }
    }

    tracing::info!("ObjectSet operator shutting down");
    Ok(())
}
