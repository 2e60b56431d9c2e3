//! The four staking transaction kinds.
//!
//! One tagged variant with a shared capability surface
//! (`validate_basic`, `signers`, `type_tag`, `sign_bytes`); the handler
//! selects by tag.

use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::{Error, Result};
use crate::rational::Rat;
use crate::types::{Address, Coin, Description, PubKey};

/// An unbond amount: either the full delegation or an explicit decimal
/// share count.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum SharesAmount {
    Max,
    Specific(Rat),
}

impl FromStr for SharesAmount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "MAX" {
            return Ok(SharesAmount::Max);
        }
        let shares = s.parse::<Rat>().map_err(|_| Error::BadShares)?;
        Ok(SharesAmount::Specific(shares))
    }
}

/// A staking transaction.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum Msg {
    DeclareCandidacy {
        candidate: Address,
        pub_key: PubKey,
        bond: Coin,
        description: Description,
    },
    EditCandidacy {
        candidate: Address,
        description: Description,
    },
    Delegate {
        delegator: Address,
        candidate: Address,
        bond: Coin,
    },
    Unbond {
        delegator: Address,
        candidate: Address,
        shares: SharesAmount,
    },
}

impl Msg {
    /// Routing tag for the message kind.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Msg::DeclareCandidacy { .. } => "stake/declare-candidacy",
            Msg::EditCandidacy { .. } => "stake/edit-candidacy",
            Msg::Delegate { .. } => "stake/delegate",
            Msg::Unbond { .. } => "stake/unbond",
        }
    }

    /// Addresses whose signatures the dispatch layer must check.
    pub fn signers(&self) -> Vec<Address> {
        match self {
            Msg::DeclareCandidacy { candidate, .. }
            | Msg::EditCandidacy { candidate, .. } => vec![*candidate],
            Msg::Delegate { delegator, .. } | Msg::Unbond { delegator, .. } => {
                vec![*delegator]
            }
        }
    }

    /// Canonical bytes for the signer to sign over.
    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        self.try_to_vec()
            .map_err(|err| Error::Encoding(err.to_string()))
    }

    /// Stateless validity check. No state is read or written; state-
    /// dependent checks live in the handler.
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Msg::DeclareCandidacy {
                candidate,
                bond,
                description,
                ..
            } => {
                if candidate.is_empty() {
                    return Err(Error::CandidateEmpty);
                }
                if bond.amount <= 0 {
                    return Err(Error::InvalidBond);
                }
                if description.is_empty() {
                    return Err(Error::InvalidInput(
                        "description must be included".to_string(),
                    ));
                }
                Ok(())
            }
            Msg::EditCandidacy {
                candidate,
                description,
            } => {
                if candidate.is_empty() {
                    return Err(Error::CandidateEmpty);
                }
                if description.is_empty() {
                    return Err(Error::InvalidInput(
                        "transaction must include some information to modify"
                            .to_string(),
                    ));
                }
                Ok(())
            }
            Msg::Delegate {
                delegator,
                candidate,
                bond,
            } => {
                if delegator.is_empty() {
                    return Err(Error::BadDelegatorAddr);
                }
                if candidate.is_empty() {
                    return Err(Error::BadCandidateAddr);
                }
                if bond.amount <= 0 {
                    return Err(Error::InvalidBond);
                }
                Ok(())
            }
            Msg::Unbond {
                delegator,
                candidate,
                shares,
            } => {
                if delegator.is_empty() {
                    return Err(Error::BadDelegatorAddr);
                }
                if candidate.is_empty() {
                    return Err(Error::BadCandidateAddr);
                }
                if let SharesAmount::Specific(shares) = shares {
                    if shares.is_zero() || shares.is_negative() {
                        return Err(Error::BadShares);
                    }
                }
                Ok(())
            }
        }
    }
}
