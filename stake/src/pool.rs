//! Pure pool state transitions.
//!
//! Every operation takes the pool and candidate by reference and returns
//! fresh values, so a host can stage and discard the results without
//! touching committed state. Rounding loss is absorbed by the integer
//! pool-side totals; shares float.

use crate::error::{Error, Result};
use crate::rational::Rat;
use crate::types::{Candidate, CandidateStatus, Pool};

impl Pool {
    /// Move `amount` tokens into the candidate's side of the pool,
    /// issuing new shares at the current exchange rate. Returns the
    /// updated pool and candidate along with the issued share count.
    pub fn candidate_add_tokens(
        &self,
        candidate: &Candidate,
        amount: i64,
    ) -> Result<(Pool, Candidate, Rat)> {
        if amount < 0 {
            return Err(Error::InvariantViolation(
                "cannot add a negative token amount".to_string(),
            ));
        }
        let mut pool = self.clone();
        let mut candidate = candidate.clone();
        let issued = match candidate.status {
            CandidateStatus::Bonded => {
                let issued =
                    Rat::from_int(amount).checked_div(self.bonded_share_ex_rate())?;
                pool.bonded_pool += amount;
                pool.bonded_shares = pool.bonded_shares + issued;
                issued
            }
            _ => {
                let issued =
                    Rat::from_int(amount).checked_div(self.unbonded_share_ex_rate())?;
                pool.unbonded_pool += amount;
                pool.unbonded_shares = pool.unbonded_shares + issued;
                issued
            }
        };
        candidate.assets = candidate.assets + issued;
        Ok((pool, candidate, issued))
    }

    /// Withdraw `shares` from the candidate's side of the pool. Returns
    /// the updated pool and candidate along with the token value of the
    /// removed shares, truncated toward zero.
    pub fn candidate_remove_shares(
        &self,
        candidate: &Candidate,
        shares: Rat,
    ) -> Result<(Pool, Candidate, i64)> {
        if shares.is_negative() || shares > candidate.assets {
            return Err(Error::InsufficientShares);
        }
        let mut pool = self.clone();
        let mut candidate = candidate.clone();
        let removed = match candidate.status {
            CandidateStatus::Bonded => {
                let removed = (shares * self.bonded_share_ex_rate()).evaluate()?;
                pool.bonded_pool -= removed;
                pool.bonded_shares = pool.bonded_shares - shares;
                removed
            }
            _ => {
                let removed = (shares * self.unbonded_share_ex_rate()).evaluate()?;
                pool.unbonded_pool -= removed;
                pool.unbonded_shares = pool.unbonded_shares - shares;
                removed
            }
        };
        candidate.assets = candidate.assets - shares;
        Ok((pool, candidate, removed))
    }

    /// Atomically move the candidate's entire assets from the bonded to
    /// the unbonded side, reissuing them as unbonded shares at the
    /// unbonded exchange rate. Total supply is unchanged.
    pub fn bonded_to_unbonded_pool(
        &self,
        candidate: &Candidate,
    ) -> Result<(Pool, Candidate)> {
        if candidate.status != CandidateStatus::Bonded {
            return Err(Error::InvariantViolation(format!(
                "candidate {} is not bonded",
                candidate.owner
            )));
        }
        let tokens = (candidate.assets * self.bonded_share_ex_rate()).evaluate()?;
        let issued = Rat::from_int(tokens).checked_div(self.unbonded_share_ex_rate())?;

        let mut pool = self.clone();
        pool.bonded_shares = pool.bonded_shares - candidate.assets;
        pool.bonded_pool -= tokens;
        pool.unbonded_shares = pool.unbonded_shares + issued;
        pool.unbonded_pool += tokens;

        let mut candidate = candidate.clone();
        candidate.assets = issued;
        candidate.status = CandidateStatus::Unbonded;
        Ok((pool, candidate))
    }

    /// Inverse of [`Pool::bonded_to_unbonded_pool`]: move the
    /// candidate's entire assets into the bonded side.
    pub fn unbonded_to_bonded_pool(
        &self,
        candidate: &Candidate,
    ) -> Result<(Pool, Candidate)> {
        if candidate.status == CandidateStatus::Bonded {
            return Err(Error::InvariantViolation(format!(
                "candidate {} is already bonded",
                candidate.owner
            )));
        }
        let tokens = (candidate.assets * self.unbonded_share_ex_rate()).evaluate()?;
        let issued = Rat::from_int(tokens).checked_div(self.bonded_share_ex_rate())?;

        let mut pool = self.clone();
        pool.unbonded_shares = pool.unbonded_shares - candidate.assets;
        pool.unbonded_pool -= tokens;
        pool.bonded_shares = pool.bonded_shares + issued;
        pool.bonded_pool += tokens;

        let mut candidate = candidate.clone();
        candidate.assets = issued;
        candidate.status = CandidateStatus::Bonded;
        Ok((pool, candidate))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::types::tests::{addr, pub_key};
    use crate::types::Description;

    use super::*;

    fn candidate(i: u8, status: CandidateStatus) -> Candidate {
        let mut c = Candidate::new(addr(i), pub_key(i), Description::default());
        c.status = status;
        c
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

    #[test]
    fn adding_to_an_empty_side_issues_shares_at_par() {
        let pool = Pool::initial(Rat::ZERO);
        let c = candidate(1, CandidateStatus::Unbonded);

        let (pool, c, issued) = pool.candidate_add_tokens(&c, 1000).unwrap();
        assert_eq!(issued, Rat::from_int(1000));
        assert_eq!(c.assets, Rat::from_int(1000));
        assert_eq!(pool.unbonded_pool, 1000);
        assert_eq!(pool.unbonded_shares, Rat::from_int(1000));
        assert_eq!(pool.bonded_pool, 0);
    }

    #[test]
    fn add_tokens_uses_the_bonded_rate_for_bonded_candidates() {
        // 100 tokens backing 50 shares: exchange rate 2.
        let pool = Pool {
            total_supply: 100,
            bonded_pool: 100,
            unbonded_pool: 0,
            bonded_shares: Rat::from_int(50),
            unbonded_shares: Rat::ZERO,
            inflation: Rat::ZERO,
        };
        let c = candidate(1, CandidateStatus::Bonded);

        let (pool, c, issued) = pool.candidate_add_tokens(&c, 10).unwrap();
        assert_eq!(issued, Rat::from_int(5));
        assert_eq!(c.assets, Rat::from_int(5));
        assert_eq!(pool.bonded_pool, 110);
        assert_eq!(pool.bonded_shares, Rat::from_int(55));
    }

    #[test]
    fn remove_shares_rejects_more_than_held() {
        let pool = seeded_pool(0, 100);
        let mut c = candidate(1, CandidateStatus::Unbonded);
        c.assets = Rat::from_int(10);

        let err = pool
            .candidate_remove_shares(&c, Rat::from_int(11))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientShares));
    }

    #[test]
    fn add_then_remove_round_trips_within_one_token() {
        let pool = seeded_pool(300, 100);
        let mut c = candidate(1, CandidateStatus::Bonded);
        c.assets = Rat::from_int(30);

        let (pool2, c2, issued) = pool.candidate_add_tokens(&c, 7).unwrap();
        let (pool3, c3, removed) = pool2.candidate_remove_shares(&c2, issued).unwrap();

        assert!((7 - removed).abs() <= 1);
        assert_eq!(c3.assets, c.assets);
        assert_eq!(pool3.bonded_shares, pool.bonded_shares);
        assert!((pool3.bonded_pool - pool.bonded_pool).abs() <= 1);
    }

    #[test]
    fn pool_transitions_preserve_total_supply() {
        let mut pool = seeded_pool(400_000_000, 150_000_000);
        let mut c = candidate(9, CandidateStatus::Bonded);
        c.assets = Rat::from_int(100_000_000);

        let before = pool.total_supply;
        let (p, c) = pool.bonded_to_unbonded_pool(&c).unwrap();
        pool = p;
        assert_eq!(pool.total_supply, before);
        assert_eq!(pool.bonded_pool, 300_000_000);
        assert_eq!(pool.unbonded_pool, 250_000_000);
        assert_eq!(c.status, CandidateStatus::Unbonded);
        assert_eq!(c.assets, Rat::from_int(100_000_000));

        let (pool, c) = pool.unbonded_to_bonded_pool(&c).unwrap();
        assert_eq!(pool.total_supply, before);
        assert_eq!(pool.bonded_pool, 400_000_000);
        assert_eq!(c.status, CandidateStatus::Bonded);
    }

    #[test]
    fn transition_reissues_at_the_destination_rate() {
        // Bonded rate 2 (200 tokens / 100 shares), unbonded rate 1.
        let pool = Pool {
            total_supply: 300,
            bonded_pool: 200,
            unbonded_pool: 100,
            bonded_shares: Rat::from_int(100),
            unbonded_shares: Rat::from_int(100),
            inflation: Rat::ZERO,
        };
        let mut c = candidate(2, CandidateStatus::Bonded);
        c.assets = Rat::from_int(10);

        let (pool, c) = pool.bonded_to_unbonded_pool(&c).unwrap();
        // 10 shares at rate 2 = 20 tokens, reissued 1:1 on the unbonded
        // side.
        assert_eq!(c.assets, Rat::from_int(20));
        assert_eq!(pool.bonded_pool, 180);
        assert_eq!(pool.unbonded_pool, 120);
        assert_eq!(pool.bonded_shares, Rat::from_int(90));
        assert_eq!(pool.unbonded_shares, Rat::from_int(120));
    }

    #[test]
    fn transition_requires_the_matching_status() {
        let pool = seeded_pool(100, 100);
        let c = candidate(1, CandidateStatus::Unbonded);
        assert!(pool.bonded_to_unbonded_pool(&c).is_err());

        let c = candidate(1, CandidateStatus::Bonded);
        assert!(pool.unbonded_to_bonded_pool(&c).is_err());
    }

    proptest! {
        // Round trip: issuing shares for tokens and removing the same
        // shares returns the tokens, up to one unit of pool-side
        // rounding.
        #[test]
        fn prop_add_remove_round_trip(
            bonded in 1_i64..1_000_000_000,
            shares in 1_i64..1_000_000_000,
            amount in 1_i64..1_000_000,
        ) {
            let pool = Pool {
                total_supply: bonded,
                bonded_pool: bonded,
                unbonded_pool: 0,
                bonded_shares: Rat::from_int(shares),
                unbonded_shares: Rat::ZERO,
                inflation: Rat::ZERO,
            };
            let c = candidate(1, CandidateStatus::Bonded);

            let (pool2, c2, issued) = pool.candidate_add_tokens(&c, amount).unwrap();
            let (pool3, c3, removed) = pool2.candidate_remove_shares(&c2, issued).unwrap();

            prop_assert!((amount - removed).abs() <= 1);
            prop_assert_eq!(c3.assets, c.assets);
            prop_assert_eq!(pool3.bonded_shares, pool.bonded_shares);
            prop_assert!((pool3.bonded_pool - pool.bonded_pool).abs() <= 1);
        }

        // Moving a candidate across pools never mints or burns supply.
        #[test]
        fn prop_transitions_conserve_supply(
            bonded in 1_i64..1_000_000_000,
            unbonded in 1_i64..1_000_000_000,
            assets in 1_i64..1_000_000,
        ) {
            prop_assume!(assets <= bonded);
            let pool = seeded_pool(bonded, unbonded);
            let mut c = candidate(1, CandidateStatus::Bonded);
            c.assets = Rat::from_int(assets);

            let (pool2, c2) = pool.bonded_to_unbonded_pool(&c).unwrap();
            prop_assert_eq!(pool2.total_supply, pool.total_supply);
            prop_assert_eq!(
                pool2.bonded_pool + pool2.unbonded_pool,
                pool.bonded_pool + pool.unbonded_pool
            );

            let (pool3, _) = pool2.unbonded_to_bonded_pool(&c2).unwrap();
            prop_assert_eq!(pool3.total_supply, pool.total_supply);
        }
    }
}
