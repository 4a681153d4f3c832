// ecmcli-api: Async Rust client for the Cradlepoint ECM cloud API

mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod glob;
pub mod models;
mod paging;
pub mod query;
pub mod resources;
pub mod transport;
pub mod tree;

pub use client::{DEFAULT_ACCOUNTS_URL, DEFAULT_SITE, EcmClient};
pub use error::Error;
pub use events::{ApiEvent, ApiListener, ListenerId, RequestOutcome};
pub use paging::page_size_for_rows;
pub use query::Query;
pub use reqwest::Method;
pub use resources::{
    AccountCounts, DEFAULT_REMOTE_CONCURRENCY, RemoteHit, RemoteRow, RouterSelection,
    parse_message_handle, record_id, record_str,
};
pub use transport::{TlsMode, TransportConfig};
