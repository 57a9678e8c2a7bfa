//! Satoshi/wei conversion. The two chains disagree on decimal places (8 for
//! satoshis, 18 for the contract's token); this is the one place that gap
//! is bridged, so the swap state machine never mixes units itself.

use ethers::types::U256;

/// 10^18 / 10^8, i.e. one satoshi's worth of the 18-decimal token unit.
pub const WEI_PER_SATOSHI: u64 = 10_000_000_000;

pub fn satoshi_to_wei(sats: u64) -> U256 {
    U256::from(sats) * U256::from(WEI_PER_SATOSHI)
}

/// Truncates rather than rounds, matching the original's plain integer
/// division.
pub fn wei_to_satoshi(wei: U256) -> u64 {
    (wei / U256::from(WEI_PER_SATOSHI)).as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_on_exact_multiples() {
        assert_eq!(wei_to_satoshi(satoshi_to_wei(12_345)), 12_345);
    }

    #[test]
    fn truncates_remainder() {
        let wei = satoshi_to_wei(1) + U256::from(1);
        assert_eq!(wei_to_satoshi(wei), 1);
    }

    #[test]
    fn zero_stays_zero() {
        assert_eq!(wei_to_satoshi(satoshi_to_wei(0)), 0);
    }
}
