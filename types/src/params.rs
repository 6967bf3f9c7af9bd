//! Fixed transaction parameters: chain id and per-operation gas settings.
//!
//! These come from deployment configuration and are never taken from request
//! input.

use serde::{Deserialize, Serialize};

/// Chain id of the Sepolia test network.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Gas limit and gas price (in wei) for one kind of contract call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasParams {
    pub gas_limit: u64,
    pub gas_price_wei: u128,
}

impl GasParams {
    pub fn from_gwei(gas_limit: u64, gas_price_gwei: u64) -> Self {
        Self {
            gas_limit,
            gas_price_wei: gas_price_gwei as u128 * WEI_PER_GWEI,
        }
    }
}

/// Everything a transaction needs besides the call itself and the nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionParams {
    pub chain_id: u64,
    pub create_poll: GasParams,
    pub vote: GasParams,
}

impl Default for TransactionParams {
    fn default() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            create_poll: GasParams::from_gwei(2_000_000, 25),
            vote: GasParams::from_gwei(200_000, 20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gwei_is_scaled_to_wei() {
        let gas = GasParams::from_gwei(21_000, 25);
        assert_eq!(gas.gas_price_wei, 25_000_000_000);
    }

    #[test]
    fn defaults_differ_per_operation() {
        let params = TransactionParams::default();
        assert_eq!(params.chain_id, SEPOLIA_CHAIN_ID);
        assert!(params.create_poll.gas_limit > params.vote.gas_limit);
    }
}
