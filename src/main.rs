// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use k8s_constructs::{
    config::ChartConfig,
    env_file::read_env_file,
    hash::hash_value,
    labels::{K8S_MANAGED_BY, MANAGED_BY_CONSTRUCTS},
    manifest::{parse_documents, parse_objects, render_documents},
    quota::{aggregate, build_resource_quota},
    web_service::{WebService, WebServiceProps},
};
use tracing::{debug, info};

/// Render and inspect Kubernetes manifest constructs
#[derive(Parser)]
#[command(name = "k8s-constructs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content hash of a JSON or YAML document
    Hash {
        /// Document to hash
        file: PathBuf,
    },

    /// Aggregate the workloads of a manifest into a ResourceQuota
    Quota {
        /// Multi-document YAML manifest
        manifest: PathBuf,

        /// Name of the ResourceQuota
        #[arg(long, default_value = "compute-quota")]
        name: String,

        /// Namespace of the ResourceQuota
        #[arg(long, env = "NAMESPACE")]
        namespace: Option<String>,
    },

    /// Compose a web service from a YAML props file and chart environment variables
    WebService {
        /// Web service props (YAML)
        props: PathBuf,
    },

    /// List the keys of a .env file
    EnvFile {
        /// The .env file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so rendered manifests can be piped.
    //
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (json or text).
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Hash { file } => hash(&file),
        Commands::Quota {
            manifest,
            name,
            namespace,
        } => quota(&manifest, &name, namespace.as_deref()),
        Commands::WebService { props } => web_service(&props),
        Commands::EnvFile { file } => env_file(&file),
    }
}

fn read(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "Reading input");
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn hash(file: &Path) -> Result<()> {
    let documents = parse_documents(&read(file)?)?;
    let [document] = documents.as_slice() else {
        anyhow::bail!(
            "{} must contain exactly one document, found {}",
            file.display(),
            documents.len()
        );
    };
    println!("{}", hash_value(document));
    Ok(())
}

fn quota(manifest: &Path, name: &str, namespace: Option<&str>) -> Result<()> {
    let objects = parse_objects(&read(manifest)?)?;
    info!(objects = objects.len(), "Loaded manifest");

    let spec = aggregate(&objects)?;
    let mut labels = BTreeMap::new();
    labels.insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_CONSTRUCTS.to_string());
    let quota = build_resource_quota(name, namespace, labels, &spec);

    print!("{}", render_documents(&[serde_json::to_value(&quota)?])?);
    Ok(())
}

fn web_service(props: &Path) -> Result<()> {
    let chart = ChartConfig::from_env()?;
    let props: WebServiceProps = serde_yaml::from_str(&read(props)?)
        .with_context(|| format!("Invalid web service props in {}", props.display()))?;

    let web_service = WebService::new(&chart, props)?;
    print!("{}", render_documents(&web_service.to_manifests()?)?);
    Ok(())
}

fn env_file(file: &Path) -> Result<()> {
    let entries = read_env_file(file)?;
    info!(keys = entries.len(), "Parsed env file");
    for (key, _) in entries {
        println!("{key}");
    }
    Ok(())
}
