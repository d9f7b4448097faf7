use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::error::{Result, SmeshmonError};

/// Smallest coin unit: 1 SMH = 10^9 Smidge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Smidge(u64);

const SMIDGE_PER_SMH: u64 = 1_000_000_000;

/// Below this amount values are shown in Smidge rather than SMH
const DISPLAY_THRESHOLD: u64 = 1_000_000;

impl Smidge {
    pub const ZERO: Smidge = Smidge(0);

    pub const fn new(raw: u64) -> Self {
        Smidge(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Parse the decimal string form used by the node for 64-bit amounts
    pub fn from_decimal_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Smidge)
            .map_err(|_| SmeshmonError::InvalidAmount(format!("cannot parse: {}", s)))
    }

    pub fn checked_sub(&self, other: Smidge) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Smidge)
            .ok_or_else(|| SmeshmonError::InvalidAmount("underflow in subtraction".to_string()))
    }
}

impl Add for Smidge {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Smidge(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Smidge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < DISPLAY_THRESHOLD {
            return write!(f, "{} Smidge", self.0);
        }
        let whole = self.0 / SMIDGE_PER_SMH;
        // three decimal places, truncated
        let frac = (self.0 % SMIDGE_PER_SMH) / 1_000_000;
        if frac == 0 {
            write!(f, "{} SMH", whole)
        } else {
            let digits = format!("{:03}", frac);
            write!(f, "{}.{} SMH", whole, digits.trim_end_matches('0'))
        }
    }
}
