//! The explicit per-invocation transaction context.
//!
//! Everything a transaction builder needs is carried in one value
//! constructed by the caller; there is no process-wide flag state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Configuration for building and broadcasting one transaction.
///
/// `account_number` and `sequence` are `Option` so that account and
/// sequence zero stay representable; "not provided" is `None`, never a
/// zero sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreContext {
    /// RPC endpoint of the node, if any.
    pub node_uri: Option<String>,
    pub chain_id: String,
    /// Block height to query at; zero means latest.
    pub height: u64,
    pub gas: u64,
    /// Trust the connected node and skip proof verification.
    pub trust_node: bool,
    /// Key name the sending address is looked up under.
    pub from_address_name: String,
    pub account_number: Option<u64>,
    pub sequence: Option<u64>,
    pub memo: String,
    /// Store prefix under which account state is kept.
    pub account_store_prefix: String,
}

impl Default for CoreContext {
    fn default() -> Self {
        Self {
            node_uri: None,
            chain_id: String::new(),
            height: 0,
            gas: 0,
            trust_node: false,
            from_address_name: String::new(),
            account_number: None,
            sequence: None,
            memo: String::new(),
            account_store_prefix: "acc".to_string(),
        }
    }
}

impl CoreContext {
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    pub fn with_account_number(mut self, account_number: u64) -> Self {
        self.account_number = Some(account_number);
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Fill a missing account number from the given node query.
    pub fn ensure_account_number(
        self,
        query: impl FnOnce(&str) -> Result<u64>,
    ) -> Result<Self> {
        if self.account_number.is_some() {
            return Ok(self);
        }
        let account_number = query(&self.from_address_name)?;
        Ok(self.with_account_number(account_number))
    }
}

#[derive(Debug, Deserialize)]
struct GenesisDoc {
    chain_id: String,
}

/// Read the chain ID from a genesis document. A missing or malformed
/// document is an error; the caller decides on a fallback.
pub fn default_chain_id(genesis_path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(genesis_path)?;
    chain_id_from_genesis(&bytes)
}

fn chain_id_from_genesis(bytes: &[u8]) -> Result<String> {
    let doc: GenesisDoc = serde_json::from_slice(bytes)?;
    Ok(doc.chain_id)
}
