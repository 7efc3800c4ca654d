//! Command implementations and argument parsing for the topoanon CLI.

use std::{
    io::{self, Write},
    num::NonZeroUsize,
    path::PathBuf,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use topoanon_core::{
    Aggregation, BuildStats, DEFAULT_FIELD_EXCEPTIONS, DEFAULT_INTERFACE_PREFIX,
    DEFAULT_NODE_ROLE, DEFAULT_TOPOLOGY_NAME, DisabledGeocoder, Geocoder, Inventory,
    InventorySource, JsonExporter, RecordKind, ResolutionContext, TopologyAssembler,
    TopologyError, TopologyExporter, TopologyOptions, TopologyOptionsBuilder,
};
use topoanon_providers_netbox::{
    DEFAULT_PAGE_SIZE, NetboxClient, NetboxConfigError, SnapshotDirectory,
};
use topoanon_providers_nominatim::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, NominatimConfigError, NominatimGeocoder,
};
use tracing::{Span, field, info, instrument};

const DEFAULT_OUTPUT: &str = "topology.json";
const DEFAULT_GEOCODE_INTERVAL_MS: u64 = 1000;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "topoanon",
    about = "Convert a NetBox inventory into an anonymized topology graph."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build a topology and write it to disk.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// File the topology is written to.
    #[arg(long, short, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Topology shaping and anonymization options.
    #[command(flatten)]
    pub topology: TopologyArgs,

    /// Geocoding provider options.
    #[command(flatten)]
    pub geocoder: GeocoderArgs,

    /// Where the inventory is read from.
    #[command(subcommand)]
    pub source: RunSource,
}

/// Flags mapped onto [`TopologyOptions`].
#[derive(Debug, Args, Clone)]
pub struct TopologyArgs {
    /// Collapse devices of one tenant into a single node.
    #[arg(long)]
    pub aggregate_by_owner: bool,

    /// Collapse devices of one site into a single node. Ignored when
    /// `--aggregate-by-owner` is set.
    #[arg(long)]
    pub aggregate_by_site: bool,

    /// Leave nodes without any link out of the output.
    #[arg(long)]
    pub remove_unlinked_nodes: bool,

    /// Replace node coordinates with those of a generalized place.
    #[arg(long)]
    pub anonymize_location: bool,

    /// Drop device attributes other than the field exceptions.
    #[arg(long)]
    pub anonymize_fields: bool,

    /// Attribute kept by `--anonymize-fields`; repeat for several. Defaults
    /// to `status` and `tags`.
    #[arg(long = "field-exception", value_name = "FIELD")]
    pub field_exceptions: Vec<String>,

    /// Replace interface names in link properties with aliases.
    #[arg(long)]
    pub anonymize_interfaces: bool,

    /// Prefix of generated interface aliases.
    #[arg(long, default_value = DEFAULT_INTERFACE_PREFIX)]
    pub interface_prefix: String,

    /// Replace primary addresses with synthetic ones.
    #[arg(long)]
    pub anonymize_ips: bool,

    /// Device role slug that makes a device a node.
    #[arg(long, default_value = DEFAULT_NODE_ROLE)]
    pub node_role: String,

    /// Name recorded in the output topology.
    #[arg(long, default_value = DEFAULT_TOPOLOGY_NAME)]
    pub topology_name: String,
}

/// Flags selecting and configuring the geocoder.
#[derive(Debug, Args, Clone)]
pub struct GeocoderArgs {
    /// Never contact a geocoding service; unresolved locations stay empty.
    #[arg(long)]
    pub offline: bool,

    /// Base URL of a Nominatim-compatible service.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub geocoder_url: String,

    /// User agent identifying this tool to the geocoding service.
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Minimum delay between geocoding requests, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_GEOCODE_INTERVAL_MS)]
    pub geocode_interval_ms: u64,
}

/// Inventory sources.
#[derive(Debug, Subcommand, Clone)]
pub enum RunSource {
    /// Read from a NetBox REST API.
    Api(ApiArgs),
    /// Read from a directory of exported JSON files.
    Snapshot(SnapshotArgs),
}

/// NetBox API arguments.
#[derive(Debug, Args, Clone)]
pub struct ApiArgs {
    /// API root, for example `https://netbox.example.org/api`.
    #[arg(long)]
    pub url: String,

    /// API token.
    #[arg(long, env = "NETBOX_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// Records requested per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE.get())]
    pub page_size: usize,
}

/// Snapshot directory arguments.
#[derive(Debug, Args, Clone)]
pub struct SnapshotArgs {
    /// Directory holding `devices.json`, `cables.json`, `sites.json` and
    /// `circuits.json`.
    pub dir: PathBuf,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The NetBox source configuration is invalid.
    #[error(transparent)]
    Netbox(#[from] NetboxConfigError),
    /// The geocoder configuration is invalid.
    #[error(transparent)]
    Geocoder(#[from] NominatimConfigError),
    /// Option validation or export failed.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Summarises the outcome of a run.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Name reported by the inventory source.
    pub source: String,
    /// File the topology was written to.
    pub output: PathBuf,
    /// Number of institutions in the topology.
    pub institutions: usize,
    /// Record categories that could not be fetched.
    pub failed_categories: Vec<RecordKind>,
    /// Assembly counters.
    pub stats: BuildStats,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when configuration is invalid or the output cannot be
/// written. Unreachable inventory categories and geocoding failures only
/// degrade the result.
///
/// # Examples
/// ```
/// # use std::{error::Error, ffi::OsString};
/// # use clap::Parser;
/// # use topoanon_cli::cli::{Cli, run_cli};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let snapshot = tempfile::tempdir()?;
/// std::fs::write(snapshot.path().join("devices.json"), "[]")?;
/// let output = snapshot.path().join("topology.json");
/// let args: Vec<OsString> = vec![
///     "topoanon".into(),
///     "run".into(),
///     "--offline".into(),
///     "--output".into(),
///     output.clone().into(),
///     "snapshot".into(),
///     snapshot.path().as_os_str().to_owned(),
/// ];
/// let cli = Cli::try_parse_from(args)?;
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.stats.emitted_nodes, 0);
/// assert!(output.exists());
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Run(run) => {
            Span::current().record("command", field::display("run"));
            run_command(run)
        }
    }
}

#[instrument(
    name = "cli.execute",
    err,
    skip(command),
    fields(source = field::Empty, output = %command.output.display(), offline = command.geocoder.offline),
)]
pub(super) fn run_command(command: RunCommand) -> Result<ExecutionSummary, CliError> {
    let RunCommand {
        output,
        topology,
        geocoder,
        source,
    } = command;
    let options = topology_options(topology)?;
    let geocoder = build_geocoder(&geocoder)?;
    let source = open_source(source)?;
    Span::current().record("source", field::display(source.name()));

    let inventory = Inventory::collect(&*source);
    let failed_categories = inventory.failed_categories().to_vec();

    let mut context = ResolutionContext::new(geocoder, &options);
    let assembled = TopologyAssembler::new(options).build(&inventory, &mut context);
    JsonExporter::new(&output).export(&assembled.topology)?;

    info!(
        nodes = assembled.stats.emitted_nodes,
        links = assembled.topology.links.len(),
        output = %output.display(),
        "command completed"
    );
    Ok(ExecutionSummary {
        source: source.name().to_owned(),
        output,
        institutions: assembled.topology.institutions.len(),
        failed_categories,
        stats: assembled.stats,
    })
}

pub(super) fn topology_options(args: TopologyArgs) -> Result<TopologyOptions, TopologyError> {
    let field_exceptions = if args.field_exceptions.is_empty() {
        DEFAULT_FIELD_EXCEPTIONS
            .iter()
            .map(|field| (*field).to_owned())
            .collect()
    } else {
        args.field_exceptions
    };
    TopologyOptionsBuilder::new()
        .with_aggregation(Aggregation::from_flags(
            args.aggregate_by_owner,
            args.aggregate_by_site,
        ))
        .with_remove_unlinked_nodes(args.remove_unlinked_nodes)
        .with_anonymize_location(args.anonymize_location)
        .with_anonymize_fields(args.anonymize_fields)
        .with_field_exceptions(field_exceptions)
        .with_anonymize_interfaces(args.anonymize_interfaces)
        .with_interface_prefix(args.interface_prefix)
        .with_anonymize_ips(args.anonymize_ips)
        .with_node_role(args.node_role)
        .with_topology_name(args.topology_name)
        .build()
}

pub(super) fn build_geocoder(args: &GeocoderArgs) -> Result<Box<dyn Geocoder>, CliError> {
    if args.offline {
        return Ok(Box::new(DisabledGeocoder));
    }
    let geocoder = NominatimGeocoder::new(args.geocoder_url.as_str(), args.user_agent.as_str())?
        .with_min_interval(Duration::from_millis(args.geocode_interval_ms));
    Ok(Box::new(geocoder))
}

#[instrument(name = "cli.open_source", err, skip(source))]
pub(super) fn open_source(source: RunSource) -> Result<Box<dyn InventorySource>, CliError> {
    match source {
        RunSource::Api(args) => {
            let page_size =
                NonZeroUsize::new(args.page_size).ok_or(NetboxConfigError::ZeroPageSize)?;
            let client = NetboxClient::new(args.url, args.token)?.with_page_size(page_size);
            Ok(Box::new(client))
        }
        RunSource::Snapshot(args) => Ok(Box::new(SnapshotDirectory::open(&args.dir)?)),
    }
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let stats = &summary.stats;
    writeln!(writer, "source: {}", summary.source)?;
    writeln!(writer, "output: {}", summary.output.display())?;
    writeln!(writer, "institutions: {}", summary.institutions)?;
    writeln!(
        writer,
        "nodes: {} ({} candidates, {} dropped as unlinked)",
        stats.emitted_nodes, stats.candidate_nodes, stats.removed_unlinked_nodes
    )?;
    writeln!(
        writer,
        "links: {} (cables {}, circuits {}, site fallback {})",
        stats.links.total(),
        stats.links.cable_links,
        stats.links.resolved_circuit_links,
        stats.links.site_fallback_links
    )?;
    writeln!(writer, "skipped records: {}", stats.skipped_records)?;
    if !summary.failed_categories.is_empty() {
        let names: Vec<&str> = summary
            .failed_categories
            .iter()
            .map(|kind| kind.category())
            .collect();
        writeln!(writer, "unavailable: {}", names.join(", "))?;
    }
    Ok(())
}
