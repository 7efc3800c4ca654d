//! Exporter boundary for finished topologies.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{info, instrument};

use crate::{Result, error::TopologyError, topology::Topology};

/// Persists a finished [`Topology`].
pub trait TopologyExporter {
    /// Writes `topology` to the exporter's destination.
    ///
    /// # Errors
    /// Returns [`TopologyError::Export`] when the destination cannot be
    /// written.
    fn export(&self, topology: &Topology) -> Result<()>;
}

/// Writes a topology as pretty-printed JSON to a file.
#[derive(Clone, Debug)]
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    /// Creates an exporter writing to `path`, replacing any existing file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `topology` as pretty JSON into any writer.
    ///
    /// # Errors
    /// Returns [`TopologyError::Export`] when serialization or the write fails.
    ///
    /// # Examples
    /// ```
    /// use topoanon_core::{Institution, JsonExporter, Topology, Urn};
    ///
    /// let topology = Topology {
    ///     name: "demo".into(),
    ///     primary_owner: Urn::generic_owner(),
    ///     institutions: vec![Institution::generic_owner()],
    ///     nodes: Vec::new(),
    ///     links: Vec::new(),
    /// };
    /// let mut out = Vec::new();
    /// JsonExporter::write_to(&topology, &mut out)?;
    /// assert!(String::from_utf8_lossy(&out).contains("\"primary_owner\": \"urn:org:generic-owner1\""));
    /// # Ok::<(), topoanon_core::TopologyError>(())
    /// ```
    pub fn write_to<W: Write>(topology: &Topology, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, topology).map_err(export_error)?;
        writer.write_all(b"\n").map_err(export_error)?;
        writer.flush().map_err(export_error)
    }
}

impl TopologyExporter for JsonExporter {
    #[instrument(name = "core.export_json", skip(self, topology), fields(path = %self.path.display()))]
    fn export(&self, topology: &Topology) -> Result<()> {
        let file = File::create(&self.path).map_err(|error| TopologyError::Export {
            message: Arc::from(format!("{}: {error}", self.path.display())),
        })?;
        Self::write_to(topology, BufWriter::new(file))?;
        info!(
            nodes = topology.nodes.len(),
            links = topology.links.len(),
            "topology written"
        );
        Ok(())
    }
}

fn export_error(error: impl std::fmt::Display) -> TopologyError {
    TopologyError::Export {
        message: Arc::from(error.to_string()),
    }
}
