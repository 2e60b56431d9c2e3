//! Chain parameters for the bonding engine.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::{Error, Result};
use crate::rational::Rat;

/// Hours in a Julian year; the provisioning cadence unit.
pub const HOURS_PER_YEAR: i64 = 8766;

/// Durable chain parameters, settable only at genesis or by governance.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Params {
    /// Maximum annual change in the inflation rate.
    pub inflation_rate_change: Rat,
    /// Inflation ceiling.
    pub inflation_max: Rat,
    /// Inflation floor.
    pub inflation_min: Rat,
    /// Bonded ratio the inflation governor steers toward.
    pub goal_bonded: Rat,
    /// Maximum number of bonded validators.
    pub max_validators: u32,
    /// Identifier of the token accepted for bonding.
    pub bond_denom: String,
    /// Exponent of ten for inflation rounding.
    pub precision: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            inflation_rate_change: Rat::new(13, 100).expect("static rational"),
            inflation_max: Rat::new(20, 100).expect("static rational"),
            inflation_min: Rat::new(7, 100).expect("static rational"),
            goal_bonded: Rat::new(67, 100).expect("static rational"),
            max_validators: 100,
            bond_denom: "steak".to_string(),
            precision: 10,
        }
    }
}

impl Params {
    /// Reject inconsistent chain configuration at genesis load.
    pub fn validate(&self) -> Result<()> {
        if self.inflation_min > self.inflation_max {
            return Err(Error::InvalidParams(
                "inflation floor exceeds inflation ceiling".to_string(),
            ));
        }
        if self.inflation_min.is_negative() {
            return Err(Error::InvalidParams(
                "inflation floor is negative".to_string(),
            ));
        }
        if self.inflation_rate_change.is_negative() {
            return Err(Error::InvalidParams(
                "inflation rate change is negative".to_string(),
            ));
        }
        if self.goal_bonded.is_zero() || self.goal_bonded.is_negative() {
            return Err(Error::InvalidParams(
                "goal bonded ratio must be positive".to_string(),
            ));
        }
        if self.max_validators == 0 {
            return Err(Error::InvalidParams(
                "maximum validator count must be positive".to_string(),
            ));
        }
        if self.bond_denom.is_empty() {
            return Err(Error::InvalidParams(
                "bond denomination must be set".to_string(),
            ));
        }
        Ok(())
    }
}
