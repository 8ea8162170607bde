// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

mod cli;

use anyhow::{bail, Context as _, Result};
use clap::{CommandFactory, Parser};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process;
use tokio_util::sync::CancellationToken;

use capella_provider_common::config::{AppConfig, AppConfigBuilder};
use capella_provider_common::telemetry::{error, info, setup_logging, warn};
use capella_provider_resources::provider::request::{Response, State};
use capella_provider_resources::provider::Provider;

use crate::cli::{CliArgs, Commands, Operation};

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut builder = AppConfigBuilder::default();
    if let Some(path) = &args.config {
        builder.with_file(path);
    }
    let config = builder
        .with_env()
        .with_override_option("provider.host", args.host.as_deref())
        .build()
        .context("failed to load configuration")?;
    Ok(config)
}

fn read_document(path: &Option<PathBuf>, flag: &str) -> Result<State> {
    let Some(path) = path else {
        bail!("--{flag} is required for this operation");
    };
    read_file(path)
}

fn read_file(path: &Path) -> Result<State> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(State::new(value))
}

/// Cancel in-flight calls on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(event = "Interrupted");
            token.cancel();
        }
    });
    cancel
}

async fn run_operation(
    provider: &Provider,
    type_name: &str,
    operation: Operation,
    plan: &Option<PathBuf>,
    state: &Option<PathBuf>,
    import_id: &Option<String>,
) -> Result<Response> {
    let cancel = cancel_on_interrupt();

    let resp = match operation {
        Operation::Create => provider.create(type_name, read_document(plan, "plan")?, cancel).await,
        Operation::Read => provider.read(type_name, read_document(state, "state")?, cancel).await,
        Operation::Update => {
            let (plan, state) = (read_document(plan, "plan")?, read_document(state, "state")?);
            provider.update(type_name, plan, state, cancel).await
        },
        Operation::Delete => provider.delete(type_name, read_document(state, "state")?, cancel).await,
        Operation::Import => {
            let id = import_id.as_deref().context("--import-id is required for this operation")?;
            provider.import_state(type_name, id, cancel).await
        },
        Operation::Validate => provider.validate_config(type_name, read_document(plan, "plan")?),
        Operation::ReadDataSource => {
            provider.read_data_source(type_name, read_document(plan, "plan")?, cancel).await
        },
    };
    Ok(resp)
}

async fn run(args: CliArgs) -> Result<bool> {
    let config = load_config(&args)?;
    let provider = Provider::new(config)?;

    match &args.cmd {
        Some(Commands::Schemas) => {
            print!("{}", serde_norway::to_string(&provider.schemas())?);
        },
        Some(Commands::Resources) => {
            for name in provider.resource_type_names() {
                println!("{name}");
            }
            for name in provider.data_source_type_names() {
                println!("data.{name}");
            }
        },
        Some(Commands::Run { type_name, operation, plan, state, import_id }) => {
            info!(
                event = "Starting",
                version = env!("CARGO_PKG_VERSION"),
                resource = type_name.as_str(),
                operation = ?operation,
            );

            let resp = run_operation(&provider, type_name, *operation, plan, state, import_id).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
            return Ok(!resp.diagnostics.has_error());
        },
        Some(Commands::ParseId { type_name, import_id }) => {
            let ids = provider.parse_import_id(type_name, import_id).await?;
            let decoded: Map<String, Value> = ids
                .keys()
                .filter_map(|key| ids.get(key).map(|value| (key.to_string(), Value::from(value))))
                .collect();
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        },
        None => {
            CliArgs::command().print_help()?;
            return Ok(false);
        },
    }
    Ok(true)
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    setup_logging();

    match run(args).await {
        Ok(true) => {},
        Ok(false) => process::exit(1),
        Err(e) => {
            error!(
                event = "Error",
                error = %e,
            );
            process::exit(1);
        },
    }
}
