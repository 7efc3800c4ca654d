//! NetBox inventory sources for the topoanon engine.
//!
//! [`NetboxClient`] walks the paginated REST API; [`SnapshotDirectory`]
//! replays a directory of previously exported JSON files.

mod client;
mod errors;
mod page;
mod snapshot;

pub use client::{
    DEFAULT_PAGE_SIZE, HttpTransport, NetboxClient, NetboxEndpoint, UreqTransport, endpoint_path,
};
pub use errors::NetboxConfigError;
pub use page::{RecordPage, decode_page};
pub use snapshot::{SnapshotDirectory, snapshot_file_name};
