//! Command-line interface for converting a NetBox inventory into an
//! anonymized topology file.
//!
//! The single `run` command reads the inventory from the live API or from a
//! snapshot directory, assembles the topology and writes it as JSON.

mod commands;

pub use commands::{
    ApiArgs, Cli, CliError, Command, ExecutionSummary, GeocoderArgs, RunCommand, RunSource,
    SnapshotArgs, TopologyArgs, render_summary, run_cli,
};
