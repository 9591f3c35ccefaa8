//! Amount types for wei and USD fixed-point values

use alloy_primitives::U256;
use alloy_primitives::utils::{UnitsError, format_ether, format_units, parse_ether};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Fixed-point scale shared by wei amounts and normalized prices (10^18).
pub const PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Decimal places used by `PRECISION`.
pub const PRECISION_DECIMALS: u8 = 18;

/// Native amount in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Eth(pub U256);

/// USD value with 18 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Usd(pub U256);

impl Eth {
    pub fn wei(self) -> U256 {
        self.0
    }
}

impl Display for Eth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = format_ether(self.0);
        write!(f, "{} ETH", trim_fraction(&formatted))
    }
}

impl FromStr for Eth {
    type Err = UnitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_ether(s.trim()).map(Eth)
    }
}

impl Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = format_units(self.0, PRECISION_DECIMALS).map_err(|_| fmt::Error)?;
        // Cents only need a few guard digits before rounding
        let (whole, fraction) = formatted.split_once('.').unwrap_or((&formatted, "0"));
        let guarded = &fraction[..fraction.len().min(4)];
        match Decimal::from_str(&format!("{whole}.{guarded}")) {
            Ok(value) => write!(
                f,
                "${:.2}",
                value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            ),
            Err(_) => write!(f, "${whole}.{:0<2.2}", guarded),
        }
    }
}

fn trim_fraction(value: &str) -> &str {
    if value.contains('.') {
        value.trim_end_matches('0').trim_end_matches('.')
    } else {
        value
    }
}
