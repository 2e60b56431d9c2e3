//! Client-side collaborators of the bonding engine: the explicit
//! transaction-context configuration and the local sequence-number
//! cache.
//!
//! Nothing in here is read by the core; the engine only defines the
//! shapes so that hosts and wallets agree on them.

mod context;
mod sequence;

pub use context::{default_chain_id, CoreContext};
pub use sequence::{ensure_sequence, SequenceCache, StoreSequenceCache};

use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("cannot read genesis file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed genesis document: {0}")]
    Genesis(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] meridian_storage::StoreError),
    #[error("node query failed: {0}")]
    Query(String),
}

/// Client functions result
pub type Result<T> = std::result::Result<T, ClientError>;
