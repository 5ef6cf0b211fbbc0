//! # Vault Ledger
//!
//! A minimal tokenized vault: depositors exchange a base asset for
//! proportional ownership shares, a single trusted operator periodically
//! re-reports the vault's net asset value (NAV) so share price tracks
//! off-chain strategy performance, and redemptions burn shares immediately
//! while the asset settles asynchronously through an operator-acknowledged
//! withdrawal queue.
//!
//! ## Architecture
//!
//! ```text
//! config.rs   — decimal precision parameters and derived scale factors
//! math.rs     — overflow-safe proportional arithmetic (256-bit mul_div)
//! ports.rs    — the two consumed capabilities: asset transfer + ownership
//! events.rs   — observable events for off-chain indexers and executors
//! vault.rs    — the ledger state machine (the part with the invariants)
//! service.rs  — single-writer lock boundary + structured logging
//! ```
//!
//! ## Design Principles
//!
//! 1. All monetary arithmetic is checked -- `checked_add`/`checked_sub`
//!    everywhere, and a 256-bit intermediate for the proportional formulas,
//!    because wrapping arithmetic and money do not mix.
//! 2. Strict pre-validation: every operation validates completely before
//!    mutating, so an error return means nothing changed.
//! 3. Capabilities over inheritance: the asset and the operator privilege
//!    are tiny traits the ledger consumes, not base classes it extends.
//! 4. Every public type is serializable (serde) so hosts can persist,
//!    snapshot, or ship the state as a single blob.

pub mod config;
pub mod events;
pub mod math;
pub mod ports;
pub mod service;
pub mod vault;

pub use config::{ConfigError, VaultConfig, ASSET_DECIMALS, SHARE_DECIMALS};
pub use events::VaultEvent;
pub use ports::{
    AssetTransferPort, GateError, InMemoryAsset, OwnershipGate, SingleOperator, TransferDeclined,
};
pub use service::VaultService;
pub use vault::{VaultError, VaultLedger, WithdrawalRequest};
