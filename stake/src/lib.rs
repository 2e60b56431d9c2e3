//! The Meridian proof-of-stake bonding and inflation engine.
//!
//! The engine keeps a global token [`Pool`](types::Pool), a registry of
//! validator [`Candidate`](types::Candidate)s with delegator shares, and
//! an hourly inflation process that mints provisions into the bonded
//! side of the pool. All pool math runs on exact rationals
//! ([`rational::Rat`]); persisted state lives behind the
//! [`Keeper`](keeper::Keeper) in an ordered key/value store; the host
//! drives the engine through [`handler::App`] one transaction or block
//! boundary at a time.

pub mod error;
pub mod handler;
pub mod inflation;
pub mod keeper;
pub mod msg;
pub mod params;
pub mod pool;
pub mod rational;
pub mod types;

pub use error::{Code, Error, Result};
pub use handler::{App, DeliverResult, ValidatorUpdate};
pub use keeper::Keeper;
pub use msg::{Msg, SharesAmount};
pub use params::{Params, HOURS_PER_YEAR};
pub use rational::Rat;
pub use types::{
    Address, Candidate, CandidateStatus, Coin, Delegation, Description, Pool,
    PubKey,
};
