// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[
    clap(
        name = "terraform-provider-capella",
        version,
        author,
        about = "Drive the Couchbase Capella provider lifecycle from the command line"
    )
]
pub struct CliArgs {
    /// Provider configuration file (JSON, YAML or TOML)
    #[clap(long, global = true, env = "CAPELLA_CONFIG_FILE")]
    pub config: Option<String>,
    /// Override the Capella API host
    #[clap(long, global = true)]
    pub host: Option<String>,
    #[clap(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[
        clap(
            name = "schemas",
            about = "Print the schema of every resource and data source as YAML"
        )
    ]
    Schemas,
    #[
        clap(
            name = "resources",
            about = "List the resource and data source type names"
        )
    ]
    Resources,
    #[
        clap(
            name = "run",
            about = "Run one lifecycle operation and print the response as JSON"
        )
    ]
    Run {
        /// Resource or data source type, full name or suffix
        type_name: String,
        #[clap(value_enum)]
        operation: Operation,
        /// Planned values, or the configuration for validate and data source reads
        #[clap(long)]
        plan: Option<PathBuf>,
        /// Prior state
        #[clap(long)]
        state: Option<PathBuf>,
        /// Identifier to import
        #[clap(long)]
        import_id: Option<String>,
    },
    #[
        clap(
            name = "parse-id",
            about = "Decode an import identifier for a resource type",
        )
    ]
    ParseId {
        type_name: String,
        import_id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    Validate,
    ReadDataSource,
}
