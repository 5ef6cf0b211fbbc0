//! # Vault Parameters
//!
//! Decimal precision and scaling constants for the vault. Every scale factor
//! used by the share arithmetic is derived here -- if you find a `10u128.pow`
//! anywhere else in the crate, that's a bug.
//!
//! The reference deployment pairs a 6-decimal base asset (the USDC
//! convention) with 18-decimal shares (the ERC-20 convention). Other
//! deployments can pick different precisions through [`VaultConfig`], as long
//! as shares are at least as fine-grained as the asset.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base-asset precision in the reference deployment: 6 fractional digits.
pub const ASSET_DECIMALS: u8 = 6;

/// Share precision in the reference deployment: 18 fractional digits.
pub const SHARE_DECIMALS: u8 = 18;

/// Upper bound on share precision. `10^38` still fits in a `u128`;
/// `10^39` does not.
pub const MAX_SHARE_DECIMALS: u8 = 38;

/// Errors raised when constructing a vault with unusable precision
/// parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Shares must be at least as fine-grained as the base asset, and the
    /// share unit must fit in a `u128`.
    #[error(
        "invalid decimals: asset {asset_decimals}, share {share_decimals} \
         (require asset <= share <= {MAX_SHARE_DECIMALS})"
    )]
    InvalidDecimals {
        /// Configured base-asset precision.
        asset_decimals: u8,
        /// Configured share precision.
        share_decimals: u8,
    },
}

/// Precision parameters for a vault deployment.
///
/// The defaults reproduce the reference deployment (6-decimal asset,
/// 18-decimal shares). The derived scale factors are:
///
/// * [`decimals_offset`](Self::decimals_offset) -- `10^(share - asset)`,
///   the factor that lifts a raw asset amount to share precision. The first
///   deposit mints exactly `assets * offset` shares (the 1:1 peg).
/// * [`share_unit`](Self::share_unit) -- `10^share`, one whole share in raw
///   units. Doubles as the fixed-point scale of the reported share price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Fractional digits of the base asset's native unit.
    pub asset_decimals: u8,
    /// Fractional digits of the vault's share denomination.
    pub share_decimals: u8,
}

impl VaultConfig {
    /// Creates a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDecimals`] if `asset_decimals >
    /// share_decimals` or `share_decimals > MAX_SHARE_DECIMALS`.
    pub fn new(asset_decimals: u8, share_decimals: u8) -> Result<Self, ConfigError> {
        if asset_decimals > share_decimals || share_decimals > MAX_SHARE_DECIMALS {
            return Err(ConfigError::InvalidDecimals {
                asset_decimals,
                share_decimals,
            });
        }
        Ok(Self {
            asset_decimals,
            share_decimals,
        })
    }

    /// `10^(share_decimals - asset_decimals)`: lifts raw asset units to
    /// share precision. `10^12` in the reference deployment.
    pub fn decimals_offset(&self) -> u128 {
        10u128.pow(u32::from(self.share_decimals - self.asset_decimals))
    }

    /// `10^share_decimals`: one whole share in raw units, and the scale at
    /// which [`price_per_share`](crate::vault::VaultLedger::price_per_share)
    /// is expressed. `10^18` in the reference deployment.
    pub fn share_unit(&self) -> u128 {
        10u128.pow(u32::from(self.share_decimals))
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            asset_decimals: ASSET_DECIMALS,
            share_decimals: SHARE_DECIMALS,
        }
    }
}
