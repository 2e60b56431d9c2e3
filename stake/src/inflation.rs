//! The inflation governor and the hourly provisioning tick.

use crate::error::Result;
use crate::params::{Params, HOURS_PER_YEAR};
use crate::rational::Rat;
use crate::types::Pool;

/// The annual inflation rate for the next hour.
///
/// Below the goal bonded ratio the rate drifts up, above it the rate
/// drifts down, at most `inflation_rate_change` per year, hard-clamped
/// to `[inflation_min, inflation_max]`. Once a clamp is reached the rate
/// holds there until the bonded ratio crosses the goal in the other
/// direction.
pub fn next_inflation(pool: &Pool, params: &Params) -> Result<Rat> {
    let rate_change_per_year = (Rat::ONE
        - pool.bonded_ratio().checked_div(params.goal_bonded)?)
        * params.inflation_rate_change;
    let rate_change = rate_change_per_year
        .checked_div(Rat::from_int(HOURS_PER_YEAR))?
        .round(params.precision);

    let mut inflation = pool.inflation + rate_change;
    if inflation > params.inflation_max {
        inflation = params.inflation_max;
    }
    if inflation < params.inflation_min {
        inflation = params.inflation_min;
    }
    Ok(inflation)
}

/// Mint provisions into the bonded pool for `hours` elapsed hour
/// boundaries, re-running the governor each hour.
///
/// Bonded shares are untouched, so the bonded exchange rate rises; that
/// is how stakers accrue the newly minted value.
pub fn process_provisions(pool: &Pool, params: &Params, hours: u64) -> Result<Pool> {
    let mut pool = pool.clone();
    for _ in 0..hours {
        pool.inflation = next_inflation(&pool, params)?;
        let provisions = (pool.inflation * Rat::from_int(pool.total_supply))
            .checked_div(Rat::from_int(HOURS_PER_YEAR))?
            .evaluate()?;
        pool.total_supply += provisions;
        pool.bonded_pool += provisions;
    }
    tracing::debug!(
        hours,
        inflation = %pool.inflation,
        total_supply = pool.total_supply,
        "processed provisions"
    );
    Ok(pool)
}
