//! The stateful façade over the ordered key/value store.
//!
//! All persisted state flows through the keeper, which owns the key
//! layout and keeps the power index in step with candidate writes.

use borsh::{BorshDeserialize, BorshSerialize};
use meridian_storage::KVStore;

use crate::error::{Error, Result};
use crate::params::Params;
use crate::rational::Rat;
use crate::types::{Address, Candidate, CandidateStatus, Delegation, Pool};

// Key space. Byte-wise ascending iteration over the power index yields
// candidates in descending power order, so the numeric segment must stay
// big-endian and inverted.
const POOL_KEY: [u8; 1] = [0x01];
const CANDIDATE_PREFIX: u8 = 0x02;
const POWER_INDEX_PREFIX: u8 = 0x03;
const DELEGATION_PREFIX: u8 = 0x04;
const PARAMS_KEY: [u8; 1] = [0x05];

/// Version byte carried by pool and candidate records for forward
/// migration.
const RECORD_VERSION: u8 = 1;

fn candidate_key(owner: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 20);
    key.push(CANDIDATE_PREFIX);
    key.extend_from_slice(owner.as_bytes());
    key
}

fn power_index_key(power: u64, owner: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8 + 20);
    key.push(POWER_INDEX_PREFIX);
    key.extend_from_slice(&(u64::MAX - power).to_be_bytes());
    key.extend_from_slice(owner.as_bytes());
    key
}

fn delegation_key(delegator: &Address, candidate: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 20 + 20);
    key.push(DELEGATION_PREFIX);
    key.extend_from_slice(delegator.as_bytes());
    key.extend_from_slice(candidate.as_bytes());
    key
}

fn encode_versioned<T: BorshSerialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = vec![RECORD_VERSION];
    value
        .serialize(&mut out)
        .map_err(|err| Error::Encoding(err.to_string()))?;
    Ok(out)
}

fn decode_versioned<T: BorshDeserialize>(bytes: &[u8]) -> Result<T> {
    match bytes.split_first() {
        Some((&RECORD_VERSION, rest)) => {
            T::try_from_slice(rest).map_err(|err| Error::Encoding(err.to_string()))
        }
        Some((version, _)) => Err(Error::Encoding(format!(
            "unsupported record version {}",
            version
        ))),
        None => Err(Error::Encoding("empty record".to_string())),
    }
}

fn encode_plain<T: BorshSerialize>(value: &T) -> Result<Vec<u8>> {
    value
        .try_to_vec()
        .map_err(|err| Error::Encoding(err.to_string()))
}

fn decode_plain<T: BorshDeserialize>(bytes: &[u8]) -> Result<T> {
    T::try_from_slice(bytes).map_err(|err| Error::Encoding(err.to_string()))
}

/// Stateful access to pool, candidates, delegations and parameters.
#[derive(Debug)]
pub struct Keeper<S> {
    store: S,
}

impl<S: KVStore> Keeper<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate and persist the genesis configuration and initial pool.
    pub fn init_genesis(&mut self, params: &Params, pool: &Pool) -> Result<()> {
        params.validate()?;
        if pool.inflation > params.inflation_max
            || pool.inflation < params.inflation_min
        {
            return Err(Error::InvalidParams(
                "genesis inflation is outside the configured bounds".to_string(),
            ));
        }
        self.set_params(params)?;
        self.set_pool(pool)
    }

    pub fn get_pool(&self) -> Result<Pool> {
        let bytes = self.store.get(&POOL_KEY)?.ok_or_else(|| {
            Error::InvariantViolation("pool is not initialized".to_string())
        })?;
        decode_versioned(&bytes)
    }

    pub fn set_pool(&mut self, pool: &Pool) -> Result<()> {
        self.store.set(POOL_KEY.to_vec(), encode_versioned(pool)?)?;
        Ok(())
    }

    pub fn get_params(&self) -> Result<Params> {
        let bytes = self.store.get(&PARAMS_KEY)?.ok_or_else(|| {
            Error::InvariantViolation("params are not initialized".to_string())
        })?;
        decode_plain(&bytes)
    }

    pub fn set_params(&mut self, params: &Params) -> Result<()> {
        params.validate()?;
        self.store.set(PARAMS_KEY.to_vec(), encode_plain(params)?)?;
        Ok(())
    }

    pub fn get_candidate(&self, owner: &Address) -> Result<Option<Candidate>> {
        match self.store.get(&candidate_key(owner))? {
            Some(bytes) => Ok(Some(decode_versioned(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a candidate and reconcile its power-index entry: the
    /// stale entry (keyed by the power recorded at the previous write)
    /// is deleted and a fresh one inserted, atomically within the
    /// block's write set.
    pub fn set_candidate(&mut self, candidate: &Candidate) -> Result<()> {
        let pool = self.get_pool()?;
        if let Some(previous) = self.get_candidate(&candidate.owner)? {
            self.store
                .delete(&power_index_key(index_power(&previous)?, &previous.owner))?;
        }

        let mut record = candidate.clone();
        record.voting_power = ranking_power(candidate, &pool);
        if indexed(&record) {
            self.store.set(
                power_index_key(index_power(&record)?, &record.owner),
                record.owner.as_bytes().to_vec(),
            )?;
        }
        self.store
            .set(candidate_key(&record.owner), encode_versioned(&record)?)?;
        Ok(())
    }

    pub fn remove_candidate(&mut self, owner: &Address) -> Result<()> {
        if let Some(previous) = self.get_candidate(owner)? {
            self.store
                .delete(&power_index_key(index_power(&previous)?, &previous.owner))?;
        }
        self.store.delete(&candidate_key(owner))?;
        Ok(())
    }

    pub fn get_delegation(
        &self,
        delegator: &Address,
        candidate: &Address,
    ) -> Result<Option<Delegation>> {
        match self.store.get(&delegation_key(delegator, candidate))? {
            Some(bytes) => Ok(Some(decode_plain(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_delegation(&mut self, delegation: &Delegation) -> Result<()> {
        self.store.set(
            delegation_key(&delegation.delegator, &delegation.candidate),
            encode_plain(delegation)?,
        )?;
        Ok(())
    }

    pub fn remove_delegation(
        &mut self,
        delegator: &Address,
        candidate: &Address,
    ) -> Result<()> {
        self.store.delete(&delegation_key(delegator, candidate))?;
        Ok(())
    }

    /// Candidates in descending voting-power order, lazily loaded from
    /// the power index. Ties order by ascending owner address.
    pub fn candidates_by_power(
        &self,
    ) -> impl Iterator<Item = Result<Candidate>> + '_ {
        self.store
            .iter_prefix(&[POWER_INDEX_PREFIX])
            .map(move |(_, owner_bytes)| {
                let owner = decode_owner(&owner_bytes)?;
                self.get_candidate(&owner)?.ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "power index entry without a candidate record: {}",
                        owner
                    ))
                })
            })
    }

    /// All candidate records in owner-address order.
    pub fn candidates(&self) -> impl Iterator<Item = Result<Candidate>> + '_ {
        self.store
            .iter_prefix(&[CANDIDATE_PREFIX])
            .map(|(_, bytes)| decode_versioned(&bytes))
    }
}

fn decode_owner(bytes: &[u8]) -> Result<Address> {
    let raw: [u8; 20] = bytes.try_into().map_err(|_| {
        Error::Encoding("power index value is not a 20-byte address".to_string())
    })?;
    Ok(Address(raw))
}

/// Power recorded in the index: the token value of the candidate's
/// assets on its current side of the pool. Revoked candidates rank at
/// zero and carry no entry.
fn ranking_power(candidate: &Candidate, pool: &Pool) -> Rat {
    match candidate.status {
        CandidateStatus::Bonded => candidate.assets * pool.bonded_share_ex_rate(),
        CandidateStatus::Unbonded => {
            candidate.assets * pool.unbonded_share_ex_rate()
        }
        CandidateStatus::Revoked => Rat::ZERO,
    }
}

fn index_power(candidate: &Candidate) -> Result<u64> {
    Ok(candidate.voting_power.evaluate()?.max(0) as u64)
}

/// Whether a candidate belongs in the power index.
fn indexed(candidate: &Candidate) -> bool {
    candidate.status != CandidateStatus::Revoked && !candidate.assets.is_zero()
}

#[cfg(test)]
mod tests {
    use meridian_storage::MemStore;

    use crate::types::tests::{addr, pub_key};
    use crate::types::Description;

    use super::*;

    fn genesis_keeper(pool: Pool) -> Keeper<MemStore> {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.init_genesis(&Params::default(), &pool).unwrap();
        keeper
    }

    fn seeded_pool(bonded: i64, unbonded: i64) -> Pool {
        Pool {
            total_supply: bonded + unbonded,
            bonded_pool: bonded,
            unbonded_pool: unbonded,
            bonded_shares: Rat::from_int(bonded),
            unbonded_shares: Rat::from_int(unbonded),
            inflation: Rat::new(7, 100).unwrap(),
        }
    }

    fn candidate_with_assets(i: u8, status: CandidateStatus, assets: i64) -> Candidate {
        let mut c = Candidate::new(addr(i), pub_key(i), Description::default());
        c.status = status;
        c.assets = Rat::from_int(assets);
        c.liabilities = Rat::from_int(assets);
        c
    }

    #[test]
    fn pool_persistence_round_trips() {
        let pool = seeded_pool(150, 400);
        let mut keeper = genesis_keeper(pool.clone());
        assert_eq!(keeper.get_pool().unwrap(), pool);

        // Writing back what was read changes nothing.
        let read = keeper.get_pool().unwrap();
        keeper.set_pool(&read).unwrap();
        assert_eq!(keeper.get_pool().unwrap(), pool);
    }

    #[test]
    fn uninitialized_pool_is_fatal() {
        let keeper = Keeper::new(MemStore::new());
        assert!(keeper.get_pool().unwrap_err().is_fatal());
    }

    #[test]
    fn candidate_round_trips_with_version_byte() {
        let mut keeper = genesis_keeper(seeded_pool(0, 100));
        let c = candidate_with_assets(1, CandidateStatus::Unbonded, 100);
        keeper.set_candidate(&c).unwrap();

        let loaded = keeper.get_candidate(&addr(1)).unwrap().unwrap();
        assert_eq!(loaded.owner, c.owner);
        assert_eq!(loaded.assets, c.assets);
        // The keeper refreshed the recorded power on write.
        assert_eq!(loaded.voting_power, Rat::from_int(100));

        assert_eq!(keeper.get_candidate(&addr(2)).unwrap(), None);
    }

    #[test]
    fn power_iteration_is_descending_with_owner_tie_break() {
        let mut keeper = genesis_keeper(seeded_pool(0, 600));
        for (i, assets) in [(1_u8, 300_i64), (2, 100), (3, 200), (4, 100)] {
            let c = candidate_with_assets(i, CandidateStatus::Unbonded, assets);
            keeper.set_candidate(&c).unwrap();
        }

        let owners: Vec<_> = keeper
            .candidates_by_power()
            .map(|c| c.unwrap().owner)
            .collect();
        assert_eq!(owners, vec![addr(1), addr(3), addr(2), addr(4)]);
    }

    #[test]
    fn rewriting_a_candidate_leaves_a_single_index_entry() {
        let mut keeper = genesis_keeper(seeded_pool(0, 500));
        let mut c = candidate_with_assets(1, CandidateStatus::Unbonded, 100);
        keeper.set_candidate(&c).unwrap();

        c.assets = Rat::from_int(400);
        keeper.set_candidate(&c).unwrap();

        let listed: Vec<_> = keeper
            .candidates_by_power()
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].voting_power, Rat::from_int(400));
    }

    #[test]
    fn revoked_candidates_drop_out_of_the_index() {
        let mut keeper = genesis_keeper(seeded_pool(0, 200));
        let mut c = candidate_with_assets(1, CandidateStatus::Unbonded, 200);
        keeper.set_candidate(&c).unwrap();
        assert_eq!(keeper.candidates_by_power().count(), 1);

        c.status = CandidateStatus::Revoked;
        keeper.set_candidate(&c).unwrap();
        assert_eq!(keeper.candidates_by_power().count(), 0);
        // The record itself survives.
        assert!(keeper.get_candidate(&addr(1)).unwrap().is_some());
    }

    #[test]
    fn remove_candidate_clears_record_and_index() {
        let mut keeper = genesis_keeper(seeded_pool(0, 200));
        let c = candidate_with_assets(1, CandidateStatus::Unbonded, 200);
        keeper.set_candidate(&c).unwrap();

        keeper.remove_candidate(&addr(1)).unwrap();
        assert_eq!(keeper.get_candidate(&addr(1)).unwrap(), None);
        assert_eq!(keeper.candidates_by_power().count(), 0);
    }

    #[test]
    fn delegation_round_trips() {
        let mut keeper = genesis_keeper(seeded_pool(0, 100));
        let delegation = Delegation {
            delegator: addr(7),
            candidate: addr(1),
            shares: Rat::new(50, 3).unwrap(),
            height: 42,
        };
        keeper.set_delegation(&delegation).unwrap();
        assert_eq!(
            keeper.get_delegation(&addr(7), &addr(1)).unwrap(),
            Some(delegation)
        );

        keeper.remove_delegation(&addr(7), &addr(1)).unwrap();
        assert_eq!(keeper.get_delegation(&addr(7), &addr(1)).unwrap(), None);
    }

    #[test]
    fn genesis_rejects_out_of_bounds_inflation() {
        let mut pool = seeded_pool(0, 100);
        pool.inflation = Rat::new(30, 100).unwrap();
        let mut keeper = Keeper::new(MemStore::new());
        assert!(matches!(
            keeper.init_genesis(&Params::default(), &pool),
            Err(Error::InvalidParams(_))
        ));
    }
}
