//! Core data types: the global pool, candidates and delegations.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::rational::Rat;

/// A 20-byte account address.
///
/// The all-zero address stands for "unset" at the message boundary, the
/// way a nil address does on the wire.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshDeserialize,
    BorshSerialize,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 20]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A 32-byte ed25519 consensus public key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshDeserialize,
    BorshSerialize,
)]
pub struct PubKey(pub [u8; 32]);

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A denominated token amount carried by bond messages.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Coin {
    pub denom: String,
    pub amount: i64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: i64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Candidate metadata, opaque to the engine.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize,
)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub details: String,
}

impl Description {
    pub fn new(
        moniker: impl Into<String>,
        identity: impl Into<String>,
        website: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            moniker: moniker.into(),
            identity: identity.into(),
            website: website.into(),
            details: details.into(),
        }
    }

    /// Whether every field is blank. Messages must carry at least one
    /// non-empty field.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Where a candidate's assets sit. Unbonded is the initial state; Revoked
/// is a terminal sink until manual reinstatement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize, BorshSerialize,
)]
pub enum CandidateStatus {
    Unbonded,
    Bonded,
    Revoked,
}

/// A validator candidate.
///
/// `assets` is the candidate's share balance in its side of the pool
/// (bonded side iff `status` is `Bonded`); `liabilities` is the count of
/// delegator shares issued against it.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Candidate {
    pub status: CandidateStatus,
    pub owner: Address,
    pub pub_key: PubKey,
    pub assets: Rat,
    pub liabilities: Rat,
    pub description: Description,
    /// Token value of `assets` at the last keeper write, zero when
    /// revoked. Maintained by the keeper; used only for power-index
    /// ordering.
    pub voting_power: Rat,
}

impl Candidate {
    /// A fresh candidate with no shares on either ledger.
    pub fn new(owner: Address, pub_key: PubKey, description: Description) -> Self {
        Self {
            status: CandidateStatus::Unbonded,
            owner,
            pub_key,
            assets: Rat::ZERO,
            liabilities: Rat::ZERO,
            description,
            voting_power: Rat::ZERO,
        }
    }
}

/// A delegator's share balance against one candidate.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Delegation {
    pub delegator: Address,
    pub candidate: Address,
    pub shares: Rat,
    /// Block height at which the delegation was last updated.
    pub height: u64,
}

/// The global token and share aggregates.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Pool {
    /// Total tokens in existence.
    pub total_supply: i64,
    /// Tokens in the bonded side of the pool.
    pub bonded_pool: i64,
    /// Tokens held by candidates outside the bonded set.
    pub unbonded_pool: i64,
    /// Shares outstanding against the bonded side.
    pub bonded_shares: Rat,
    /// Shares outstanding against the unbonded side.
    pub unbonded_shares: Rat,
    /// Current annual inflation rate.
    pub inflation: Rat,
}

impl Pool {
    /// An empty pool with the given starting inflation.
    pub fn initial(inflation: Rat) -> Self {
        Self {
            total_supply: 0,
            bonded_pool: 0,
            unbonded_pool: 0,
            bonded_shares: Rat::ZERO,
            unbonded_shares: Rat::ZERO,
            inflation,
        }
    }

    /// Fraction of the total supply that is bonded; zero for an empty
    /// chain.
    pub fn bonded_ratio(&self) -> Rat {
        if self.total_supply == 0 {
            return Rat::ZERO;
        }
        Rat::from_int(self.bonded_pool)
            .checked_div(Rat::from_int(self.total_supply))
            .expect("total supply is checked non-zero")
    }

    /// Tokens per bonded share; exactly one while no shares are
    /// outstanding.
    pub fn bonded_share_ex_rate(&self) -> Rat {
        if self.bonded_shares.is_zero() {
            return Rat::ONE;
        }
        Rat::from_int(self.bonded_pool)
            .checked_div(self.bonded_shares)
            .expect("bonded shares are checked non-zero")
    }

    /// Tokens per unbonded share; exactly one while no shares are
    /// outstanding.
    pub fn unbonded_share_ex_rate(&self) -> Rat {
        if self.unbonded_shares.is_zero() {
            return Rat::ONE;
        }
        Rat::from_int(self.unbonded_pool)
            .checked_div(self.unbonded_shares)
            .expect("unbonded shares are checked non-zero")
    }
}
