//! Exact rational arithmetic for pool and inflation math.

use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatError {
    #[error("zero denominator")]
    ZeroDenominator,
    #[error("division by zero")]
    DivisionByZero,
    #[error("value does not fit in 64 bits")]
    Overflow,
    #[error("malformed decimal string: {0}")]
    MalformedDecimal(String),
}

/// An exact fraction.
///
/// Always held in reduced form with a positive denominator. Arithmetic
/// runs on 128-bit intermediates so chains of add/sub/mul/div on
/// 64-bit-ranged values stay exact; rounding happens only at the two
/// explicit boundaries, [`Rat::evaluate`] and [`Rat::round`]. The
/// persisted encoding is a signed 64-bit (numerator, denominator) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rat {
    num: i128,
    den: i128,
}

impl Rat {
    pub const ZERO: Rat = Rat { num: 0, den: 1 };
    pub const ONE: Rat = Rat { num: 1, den: 1 };

    /// A fraction from a 64-bit numerator and denominator.
    pub fn new(num: i64, den: i64) -> Result<Self, RatError> {
        if den == 0 {
            return Err(RatError::ZeroDenominator);
        }
        Ok(Self::reduced(num as i128, den as i128))
    }

    /// A whole number.
    pub fn from_int(value: i64) -> Self {
        Rat {
            num: value as i128,
            den: 1,
        }
    }

    // Invariant: `den != 0`.
    fn reduced(num: i128, den: i128) -> Self {
        if num == 0 {
            return Rat::ZERO;
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i128;
        let sign = if den < 0 { -1 } else { 1 };
        Rat {
            num: sign * num / g,
            den: den.abs() / g,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    /// Exact division. Dividing by a zero rational is a domain error; the
    /// engine guards every data-driven divisor, so hitting it indicates a
    /// bug in the caller.
    pub fn checked_div(self, rhs: Rat) -> Result<Rat, RatError> {
        if rhs.num == 0 {
            return Err(RatError::DivisionByZero);
        }
        Ok(Rat::reduced(self.num * rhs.den, self.den * rhs.num))
    }

    /// Round half-to-even to a denominator of `10^precision`.
    pub fn round(self, precision: u32) -> Rat {
        let pow = 10_i128.pow(precision);
        let scaled = self.num * pow;
        // den > 0, so 0 <= r < den and scaled/den == q + r/den exactly.
        let q = scaled.div_euclid(self.den);
        let r = scaled.rem_euclid(self.den);
        let rounded = match (2 * r).cmp(&self.den) {
            Ordering::Less => q,
            Ordering::Greater => q + 1,
            Ordering::Equal => {
                if q % 2 == 0 {
                    q
                } else {
                    q + 1
                }
            }
        };
        Rat::reduced(rounded, pow)
    }

    /// Truncate toward zero to a 64-bit integer token count.
    pub fn evaluate(self) -> Result<i64, RatError> {
        i64::try_from(self.num / self.den).map_err(|_| RatError::Overflow)
    }
}

impl Add for Rat {
    type Output = Rat;

    fn add(self, rhs: Rat) -> Rat {
        Rat::reduced(self.num * rhs.den + rhs.num * self.den, self.den * rhs.den)
    }
}

impl Sub for Rat {
    type Output = Rat;

    fn sub(self, rhs: Rat) -> Rat {
        Rat::reduced(self.num * rhs.den - rhs.num * self.den, self.den * rhs.den)
    }
}

impl Mul for Rat {
    type Output = Rat;

    fn mul(self, rhs: Rat) -> Rat {
        Rat::reduced(self.num * rhs.num, self.den * rhs.den)
    }
}

impl Neg for Rat {
    type Output = Rat;

    fn neg(self) -> Rat {
        Rat {
            num: -self.num,
            den: self.den,
        }
    }
}

impl PartialOrd for Rat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rat {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive, so cross multiplication preserves
        // the ordering.
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

impl fmt::Display for Rat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Rat {
    type Err = RatError;

    /// Parse a decimal string such as `"100"`, `"-3.5"` or `"0.25"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RatError::MalformedDecimal(s.to_string());
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1_i128, rest),
            None => (1_i128, s),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        // 18 fractional digits keep the scaled numerator within i64 range
        // for any token-scale integer part.
        if frac_part.len() > 18 {
            return Err(malformed());
        }
        let parse = |part: &str| -> Result<i128, RatError> {
            if part.is_empty() {
                return Ok(0);
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse::<i128>().map_err(|_| malformed())
        };
        let int_val = parse(int_part)?;
        let frac_val = parse(frac_part)?;
        let pow = 10_i128.pow(frac_part.len() as u32);
        let num = sign * (int_val.checked_mul(pow).ok_or_else(malformed)? + frac_val);
        if i64::try_from(num).is_err() {
            return Err(RatError::Overflow);
        }
        Ok(Rat::reduced(num, pow))
    }
}

impl BorshSerialize for Rat {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        let overflow =
            || io::Error::new(io::ErrorKind::InvalidData, RatError::Overflow.to_string());
        let num = i64::try_from(self.num).map_err(|_| overflow())?;
        let den = i64::try_from(self.den).map_err(|_| overflow())?;
        num.serialize(writer)?;
        den.serialize(writer)
    }
}

impl BorshDeserialize for Rat {
    fn deserialize(buf: &mut &[u8]) -> io::Result<Self> {
        let num = i64::deserialize(buf)?;
        let den = i64::deserialize(buf)?;
        Rat::new(num, den)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
