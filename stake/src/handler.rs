//! The host-driven surface: message delivery and block boundaries.
//!
//! Every transaction is applied against a staged write overlay and
//! committed only on success, so a rejected message leaves the base
//! store untouched. Hourly provisioning runs in `begin_block`, before
//! any transaction in that block, so transactions observe the
//! post-provision exchange rates.

use meridian_storage::{KVStore, StagedStore};

use crate::error::{Code, Error, Result};
use crate::inflation::process_provisions;
use crate::keeper::Keeper;
use crate::msg::{Msg, SharesAmount};
use crate::params::Params;
use crate::types::{
    Address, Candidate, CandidateStatus, Coin, Delegation, Description, Pool,
    PubKey,
};

const SECONDS_PER_HOUR: i64 = 3600;

/// Outcome of one delivered transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverResult {
    pub code: Code,
    pub log: String,
    pub tags: Vec<(String, String)>,
}

impl DeliverResult {
    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }
}

/// A bonded validator's consensus key and integer power, emitted at the
/// end of each block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorUpdate {
    pub pub_key: PubKey,
    pub power: u64,
}

/// The bonding engine as driven by the host, one transaction or block
/// boundary at a time.
#[derive(Debug)]
pub struct App<S> {
    store: S,
    // Hour index of the last provisioning tick. In-memory only: the
    // host replays block times deterministically on restart.
    last_hour: Option<i64>,
}

impl<S: KVStore> App<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            last_hour: None,
        }
    }

    /// Validate and persist the genesis configuration.
    pub fn init_genesis(&mut self, params: &Params, pool: &Pool) -> Result<()> {
        Keeper::new(&mut self.store).init_genesis(params, pool)
    }

    /// Direct access to the committed state, for genesis wiring and
    /// queries between blocks.
    pub fn keeper(&mut self) -> Keeper<&mut S> {
        Keeper::new(&mut self.store)
    }

    /// Apply one transaction. Returns the boundary result; on any error
    /// the staged writes are discarded and the committed state is
    /// unchanged.
    pub fn deliver(&mut self, msg: &Msg, height: u64) -> DeliverResult {
        let tags = vec![("action".to_string(), msg.type_tag().to_string())];
        if let Err(err) = msg.validate_basic() {
            return DeliverResult {
                code: err.code(),
                log: err.to_string(),
                tags,
            };
        }

        let mut staged = StagedStore::new(&mut self.store);
        let applied = {
            let mut keeper = Keeper::new(&mut staged);
            apply(&mut keeper, msg, height)
        };
        match applied.and_then(|()| staged.commit().map_err(Error::from)) {
            Ok(()) => DeliverResult {
                code: Code::Ok,
                log: String::new(),
                tags,
            },
            Err(err) => {
                if err.is_fatal() {
                    tracing::error!(tag = msg.type_tag(), %err, "fatal error applying transaction");
                } else {
                    tracing::debug!(tag = msg.type_tag(), %err, "transaction rejected");
                }
                DeliverResult {
                    code: err.code(),
                    log: err.to_string(),
                    tags,
                }
            }
        }
    }

    /// Start a block. When one or more hour boundaries have been
    /// crossed since the last tick, mint provisions for each crossed
    /// hour.
    pub fn begin_block(&mut self, height: u64, time_unix_secs: i64) -> Result<()> {
        let hour = time_unix_secs.div_euclid(SECONDS_PER_HOUR);
        let elapsed = match self.last_hour {
            Some(last) if hour > last => (hour - last) as u64,
            Some(_) => 0,
            // The first observed block fixes the baseline.
            None => 0,
        };
        if let Some(last) = self.last_hour {
            self.last_hour = Some(last.max(hour));
        } else {
            self.last_hour = Some(hour);
        }
        if elapsed == 0 {
            return Ok(());
        }

        let mut staged = StagedStore::new(&mut self.store);
        {
            let mut keeper = Keeper::new(&mut staged);
            let params = keeper.get_params()?;
            let pool = keeper.get_pool()?;
            let pool = process_provisions(&pool, &params, elapsed)?;
            keeper.set_pool(&pool)?;
        }
        staged.commit()?;
        tracing::info!(height, hours = elapsed, "minted hourly provisions");
        Ok(())
    }

    /// Close a block: bond the top candidates by power, unbond the
    /// bonded ones that fell out, and emit the resulting validator set.
    pub fn end_block(&mut self) -> Result<Vec<ValidatorUpdate>> {
        let mut staged = StagedStore::new(&mut self.store);
        let updates = {
            let mut keeper = Keeper::new(&mut staged);
            update_validator_set(&mut keeper)?
        };
        staged.commit()?;
        Ok(updates)
    }
}

fn apply<S: KVStore>(keeper: &mut Keeper<S>, msg: &Msg, height: u64) -> Result<()> {
    match msg {
        Msg::DeclareCandidacy {
            candidate,
            pub_key,
            bond,
            description,
        } => declare_candidacy(keeper, *candidate, *pub_key, bond, description, height),
        Msg::EditCandidacy {
            candidate,
            description,
        } => edit_candidacy(keeper, *candidate, description),
        Msg::Delegate {
            delegator,
            candidate,
            bond,
        } => delegate(keeper, *delegator, *candidate, bond, height),
        Msg::Unbond {
            delegator,
            candidate,
            shares,
        } => unbond(keeper, *delegator, *candidate, shares, height),
    }
}

fn declare_candidacy<S: KVStore>(
    keeper: &mut Keeper<S>,
    owner: Address,
    pub_key: PubKey,
    bond: &Coin,
    description: &Description,
    height: u64,
) -> Result<()> {
    if keeper.get_candidate(&owner)?.is_some() {
        return Err(Error::InvalidInput(
            "a candidacy is already declared for that address".to_string(),
        ));
    }
    for candidate in keeper.candidates() {
        if candidate?.pub_key == pub_key {
            return Err(Error::InvalidInput(
                "consensus key is already in use".to_string(),
            ));
        }
    }

    let candidate = Candidate::new(owner, pub_key, description.clone());
    keeper.set_candidate(&candidate)?;
    // The initial bond is a self-delegation.
    delegate(keeper, owner, owner, bond, height)
}

fn edit_candidacy<S: KVStore>(
    keeper: &mut Keeper<S>,
    owner: Address,
    description: &Description,
) -> Result<()> {
    let mut candidate = keeper.get_candidate(&owner)?.ok_or(Error::CandidateEmpty)?;
    if candidate.status == CandidateStatus::Revoked {
        return Err(Error::Unauthorized);
    }
    candidate.description = description.clone();
    keeper.set_candidate(&candidate)
}

fn delegate<S: KVStore>(
    keeper: &mut Keeper<S>,
    delegator: Address,
    candidate_addr: Address,
    bond: &Coin,
    height: u64,
) -> Result<()> {
    let params = keeper.get_params()?;
    if bond.denom != params.bond_denom {
        return Err(Error::InvalidBond);
    }
    let candidate = keeper
        .get_candidate(&candidate_addr)?
        .ok_or(Error::CandidateEmpty)?;
    if candidate.status == CandidateStatus::Revoked {
        return Err(Error::Unauthorized);
    }

    let mut pool = keeper.get_pool()?;
    // The bond enters the pool from the account layer.
    pool.total_supply += bond.amount;
    let (pool, mut candidate, issued) =
        pool.candidate_add_tokens(&candidate, bond.amount)?;
    candidate.liabilities = candidate.liabilities + issued;

    let delegation = match keeper.get_delegation(&delegator, &candidate_addr)? {
        Some(mut delegation) => {
            delegation.shares = delegation.shares + issued;
            delegation.height = height;
            delegation
        }
        None => Delegation {
            delegator,
            candidate: candidate_addr,
            shares: issued,
            height,
        },
    };

    keeper.set_pool(&pool)?;
    keeper.set_candidate(&candidate)?;
    keeper.set_delegation(&delegation)
}

fn unbond<S: KVStore>(
    keeper: &mut Keeper<S>,
    delegator: Address,
    candidate_addr: Address,
    shares: &SharesAmount,
    height: u64,
) -> Result<()> {
    let mut delegation = keeper
        .get_delegation(&delegator, &candidate_addr)?
        .ok_or(Error::BadDelegatorAddr)?;
    let candidate = keeper
        .get_candidate(&candidate_addr)?
        .ok_or(Error::CandidateEmpty)?;

    let shares = match shares {
        SharesAmount::Max => delegation.shares,
        SharesAmount::Specific(shares) => *shares,
    };
    if shares > delegation.shares {
        return Err(Error::InsufficientShares);
    }
    delegation.shares = delegation.shares - shares;
    delegation.height = height;

    let pool = keeper.get_pool()?;
    let (mut pool, mut candidate, removed) =
        pool.candidate_remove_shares(&candidate, shares)?;
    candidate.liabilities = candidate.liabilities - shares;
    // Returned tokens leave the pool for the account layer.
    pool.total_supply -= removed;

    // An owner that withdraws the whole self-delegation abandons the
    // candidacy.
    if delegator == candidate_addr && delegation.shares.is_zero() {
        if candidate.status == CandidateStatus::Bonded {
            let (unbonded_pool, unbonded) = pool.bonded_to_unbonded_pool(&candidate)?;
            pool = unbonded_pool;
            candidate = unbonded;
        }
        candidate.status = CandidateStatus::Revoked;
    }

    if delegation.shares.is_zero() {
        keeper.remove_delegation(&delegator, &candidate_addr)?;
    } else {
        keeper.set_delegation(&delegation)?;
    }

    if candidate.liabilities.is_zero() {
        // Burn the residual dust so pool shares keep matching candidate
        // assets, then drop the record and its index entry.
        let (mut pool, candidate, residual) =
            pool.candidate_remove_shares(&candidate, candidate.assets)?;
        pool.total_supply -= residual;
        keeper.set_pool(&pool)?;
        keeper.remove_candidate(&candidate.owner)
    } else {
        keeper.set_pool(&pool)?;
        keeper.set_candidate(&candidate)
    }
}

/// Bond the top `max_validators` candidates by recorded power and
/// unbond any bonded candidate that fell out, in index order; then
/// report the resulting `(key, power)` set.
fn update_validator_set<S: KVStore>(
    keeper: &mut Keeper<S>,
) -> Result<Vec<ValidatorUpdate>> {
    let params = keeper.get_params()?;
    let ranked: Vec<Candidate> =
        keeper.candidates_by_power().collect::<Result<Vec<_>>>()?;
    let cutoff = (params.max_validators as usize).min(ranked.len());

    for candidate in &ranked[cutoff..] {
        if candidate.status == CandidateStatus::Bonded {
            let pool = keeper.get_pool()?;
            let (pool, demoted) = pool.bonded_to_unbonded_pool(candidate)?;
            keeper.set_pool(&pool)?;
            keeper.set_candidate(&demoted)?;
        }
    }
    for candidate in &ranked[..cutoff] {
        if candidate.status == CandidateStatus::Unbonded {
            let pool = keeper.get_pool()?;
            let (pool, promoted) = pool.unbonded_to_bonded_pool(candidate)?;
            keeper.set_pool(&pool)?;
            keeper.set_candidate(&promoted)?;
        }
    }

    let pool = keeper.get_pool()?;
    let mut updates = Vec::with_capacity(cutoff);
    for candidate in &ranked[..cutoff] {
        let bonded = keeper.get_candidate(&candidate.owner)?.ok_or_else(|| {
            Error::InvariantViolation(format!(
                "ranked candidate {} disappeared during selection",
                candidate.owner
            ))
        })?;
        let power = (bonded.assets * pool.bonded_share_ex_rate()).evaluate()?;
        updates.push(ValidatorUpdate {
            pub_key: bonded.pub_key,
            power: power.max(0) as u64,
        });
    }
    Ok(updates)
}
