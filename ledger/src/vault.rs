//! # The Vault Ledger
//!
//! One state machine holds the whole story: depositors exchange the base
//! asset for proportional ownership shares, a trusted operator periodically
//! re-reports the vault's net asset value (NAV) so share price tracks
//! off-chain strategy performance, and redemptions burn shares immediately
//! while the asset settles later through an operator-acknowledged queue.
//!
//! ## Accounting Invariants
//!
//! 1. The sum of all share balances equals `total_shares`, always.
//! 2. A queued withdrawal's `assets` figure is the floor-division value of
//!    its shares at request time. The requester's payout is fixed at that
//!    instant; NAV drift during the queue delay is the vault's risk, not
//!    theirs.
//! 3. The burn and the queue append are atomic -- a record never exists for
//!    shares that are still in circulation.
//! 4. `processed` moves false→true exactly once. Records are never deleted;
//!    the queue doubles as a permanent audit trail.
//!
//! ## Atomicity Model
//!
//! Every operation pre-validates completely, performs its single external
//! effect (an asset-port call) if it has one, and only then mutates state.
//! An error return therefore guarantees the ledger is bit-for-bit unchanged.
//! The ledger itself is single-threaded; hosts that take calls concurrently
//! wrap it in the one-lock boundary provided by
//! [`VaultService`](crate::service::VaultService).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, VaultConfig};
use crate::events::VaultEvent;
use crate::math;
use crate::ports::{AssetTransferPort, OwnershipGate, SingleOperator, TransferDeclined};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
///
/// Every variant means the operation was rejected wholesale -- there is no
/// partial state to clean up and nothing here is fatal to the ledger.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A zero or otherwise out-of-domain amount was supplied.
    #[error("invalid amount: must be greater than zero")]
    InvalidAmount,

    /// The deposit is so small it rounds to zero shares. Accepting it would
    /// siphon value from existing holders, so the guard protects them --
    /// not the depositor.
    #[error("deposit rounds to zero shares at the current share price")]
    ZeroShares,

    /// The redemption is so small it rounds to zero assets.
    #[error("redemption rounds to zero assets at the current share price")]
    ZeroAssets,

    /// Redemption attempted on a vault with no shares outstanding.
    #[error("no shares outstanding")]
    NoSupply,

    /// The caller tried to burn more shares than they hold.
    #[error("insufficient share balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The caller's current share balance.
        available: u128,
        /// The amount the caller tried to burn.
        requested: u128,
    },

    /// The asset transfer port declined to move funds. Ports are
    /// failure-safe, so no balance changed anywhere.
    #[error("external asset transfer failed: {0}")]
    TransferFailed(#[from] TransferDeclined),

    /// The caller lacks the operator privilege.
    #[error("unauthorized: '{caller}' is not the vault operator")]
    Unauthorized {
        /// The identity that attempted the privileged call.
        caller: String,
    },

    /// Double-settlement guard: the referenced request is already marked
    /// processed.
    #[error("withdrawal request {request_id} already processed")]
    AlreadyProcessed {
        /// The request that was targeted twice.
        request_id: u64,
    },

    /// The referenced request id was never issued.
    #[error("withdrawal request {request_id} does not exist")]
    RequestNotFound {
        /// The unknown request id.
        request_id: u64,
    },

    /// Checked arithmetic overflowed. Monetary math never wraps; amounts
    /// this size are a bug or an attack.
    #[error("arithmetic overflow in share accounting")]
    AmountOverflow,

    /// The supplied precision parameters are unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Withdrawal Request
// ---------------------------------------------------------------------------

/// A durable record of a pending redemption.
///
/// Created by [`VaultLedger::redeem_request`] after the shares are burned.
/// Everything except `processed` / `processed_at` is immutable, and the
/// record is never deleted -- settled requests remain as audit history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Dense sequential identifier, assigned from 0 in request order.
    pub id: u64,
    /// Address the settled assets are owed to.
    pub receiver: String,
    /// Shares burned for this request, in share units.
    pub shares: u128,
    /// Assets owed, in base-asset units, fixed at request time.
    pub assets: u64,
    /// `true` once the operator has acknowledged off-chain settlement.
    pub processed: bool,
    /// When the request was queued.
    pub requested_at: DateTime<Utc>,
    /// When settlement was acknowledged, if it has been.
    pub processed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Vault Ledger
// ---------------------------------------------------------------------------

/// The vault's complete state: NAV, share supply, per-holder balances, the
/// withdrawal queue, and the event log.
///
/// The base asset itself lives behind an [`AssetTransferPort`] handed to the
/// operations that move it; the ledger only does the bookkeeping. The whole
/// struct is serializable so a host can persist or snapshot it as one blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultLedger {
    /// Precision parameters, fixed at construction.
    config: VaultConfig,

    /// Gate guarding the privileged operations.
    gate: SingleOperator,

    /// Operator-reported NAV in base-asset units. Grows with deposits,
    /// replaced wholesale by [`set_total_assets`](Self::set_total_assets).
    total_assets: u64,

    /// Sum of all outstanding shares, in share units.
    total_shares: u128,

    /// Per-holder share balances. Sum always equals `total_shares`.
    share_balances: HashMap<String, u128>,

    /// Append-only withdrawal queue. A record's id is its index, so ids are
    /// dense from 0, never reused, and existence is simply `id < len` -- an
    /// absent record can never masquerade as a zero-valued one.
    withdrawal_requests: Vec<WithdrawalRequest>,

    /// Events not yet drained by an off-chain consumer.
    events: Vec<VaultEvent>,

    /// When the ledger was constructed.
    created_at: DateTime<Utc>,

    /// Timestamp of the most recent state change.
    updated_at: DateTime<Utc>,
}

impl VaultLedger {
    /// Creates an empty vault with the reference precision (6-decimal
    /// asset, 18-decimal shares) and the given operator.
    pub fn new(operator: &str) -> Self {
        let now = Utc::now();
        Self {
            config: VaultConfig::default(),
            gate: SingleOperator::new(operator),
            total_assets: 0,
            total_shares: 0,
            share_balances: HashMap::new(),
            withdrawal_requests: Vec::new(),
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an empty vault with explicit precision parameters.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if the parameters are unusable.
    pub fn with_config(operator: &str, config: VaultConfig) -> Result<Self, VaultError> {
        // Re-validate: the config may have been deserialized rather than
        // built through `VaultConfig::new`.
        VaultConfig::new(config.asset_decimals, config.share_decimals)?;
        let mut vault = Self::new(operator);
        vault.config = config;
        Ok(vault)
    }

    // -----------------------------------------------------------------------
    // Pricing
    // -----------------------------------------------------------------------

    /// Current share price: NAV per whole share, fixed-point at share
    /// precision (`10^18` means one whole base-asset unit per whole share).
    ///
    /// An empty vault reports the bootstrap unit price, which is exactly the
    /// rate the first deposit mints at -- the price function has no
    /// discontinuity around the first deposit.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AmountOverflow`] if the NAV is too large to
    /// price at full precision.
    pub fn price_per_share(&self) -> Result<u128, VaultError> {
        if self.total_shares == 0 {
            return Ok(self.config.share_unit());
        }
        let nav_at_share_precision = u128::from(self.total_assets)
            .checked_mul(self.config.decimals_offset())
            .ok_or(VaultError::AmountOverflow)?;
        math::mul_div(
            nav_at_share_precision,
            self.config.share_unit(),
            self.total_shares,
        )
        .ok_or(VaultError::AmountOverflow)
    }

    // -----------------------------------------------------------------------
    // Deposit
    // -----------------------------------------------------------------------

    /// Pulls `assets` from `caller` through the port and mints proportional
    /// shares to `receiver`. Returns the shares minted.
    ///
    /// The first deposit mints at the 1:1 peg (`assets * 10^(share -
    /// asset)` shares); later deposits mint `floor(assets * total_shares /
    /// total_assets)` so existing holders are never diluted relative to NAV.
    ///
    /// The asset pull happens before any state mutation: a declined
    /// transfer aborts the operation with zero residue.
    ///
    /// # Errors
    ///
    /// [`InvalidAmount`](VaultError::InvalidAmount) if `assets == 0`,
    /// [`ZeroShares`](VaultError::ZeroShares) if the mint rounds to nothing,
    /// [`TransferFailed`](VaultError::TransferFailed) if the port declines,
    /// [`AmountOverflow`](VaultError::AmountOverflow) on arithmetic overflow.
    pub fn deposit(
        &mut self,
        port: &mut dyn AssetTransferPort,
        caller: &str,
        receiver: &str,
        assets: u64,
    ) -> Result<u128, VaultError> {
        if assets == 0 {
            return Err(VaultError::InvalidAmount);
        }

        let shares = if self.total_shares == 0 {
            u128::from(assets)
                .checked_mul(self.config.decimals_offset())
                .ok_or(VaultError::AmountOverflow)?
        } else {
            math::mul_div(
                u128::from(assets),
                self.total_shares,
                u128::from(self.total_assets),
            )
            .ok_or(VaultError::AmountOverflow)?
        };
        if shares == 0 {
            return Err(VaultError::ZeroShares);
        }

        // Pre-compute every post-state value so nothing can fail after the
        // asset pull.
        let new_total_assets = self
            .total_assets
            .checked_add(assets)
            .ok_or(VaultError::AmountOverflow)?;
        let new_total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(VaultError::AmountOverflow)?;
        let new_balance = self
            .balance_of(receiver)
            .checked_add(shares)
            .ok_or(VaultError::AmountOverflow)?;

        port.pull_from(caller, assets)?;

        self.total_assets = new_total_assets;
        self.total_shares = new_total_shares;
        self.share_balances.insert(receiver.to_string(), new_balance);
        self.updated_at = Utc::now();
        self.events.push(VaultEvent::Deposit {
            caller: caller.to_string(),
            receiver: receiver.to_string(),
            assets,
            shares,
        });

        Ok(shares)
    }

    // -----------------------------------------------------------------------
    // Redemption
    // -----------------------------------------------------------------------

    /// Burns `shares` from `caller` and queues a withdrawal owed to
    /// `receiver`. Returns `(request_id, assets_queued)`.
    ///
    /// The asset amount is a snapshot: `floor(shares * total_assets /
    /// total_shares)` at call time. No asset moves here -- the off-chain
    /// executor settles later and the operator acknowledges it via
    /// [`mark_withdrawal_processed`](Self::mark_withdrawal_processed).
    ///
    /// # Errors
    ///
    /// [`InvalidAmount`](VaultError::InvalidAmount) if `shares == 0`,
    /// [`NoSupply`](VaultError::NoSupply) on an empty vault,
    /// [`InsufficientBalance`](VaultError::InsufficientBalance) if the
    /// caller holds fewer than `shares`,
    /// [`ZeroAssets`](VaultError::ZeroAssets) if the payout rounds to
    /// nothing.
    pub fn redeem_request(
        &mut self,
        caller: &str,
        receiver: &str,
        shares: u128,
    ) -> Result<(u64, u64), VaultError> {
        if shares == 0 {
            return Err(VaultError::InvalidAmount);
        }
        if self.total_shares == 0 {
            return Err(VaultError::NoSupply);
        }
        let available = self.balance_of(caller);
        if available < shares {
            return Err(VaultError::InsufficientBalance {
                available,
                requested: shares,
            });
        }

        let assets_wide = math::mul_div(shares, u128::from(self.total_assets), self.total_shares)
            .ok_or(VaultError::AmountOverflow)?;
        // shares <= total_shares, so the payout is bounded by total_assets
        // and always fits back in a u64.
        let assets = u64::try_from(assets_wide).map_err(|_| VaultError::AmountOverflow)?;
        if assets == 0 {
            return Err(VaultError::ZeroAssets);
        }

        // Commit: burn and queue as one step. Nothing below can fail.
        self.share_balances
            .insert(caller.to_string(), available - shares);
        self.total_shares -= shares;

        let request_id = self.withdrawal_requests.len() as u64;
        self.withdrawal_requests.push(WithdrawalRequest {
            id: request_id,
            receiver: receiver.to_string(),
            shares,
            assets,
            processed: false,
            requested_at: Utc::now(),
            processed_at: None,
        });
        self.updated_at = Utc::now();
        self.events.push(VaultEvent::WithdrawalRequested {
            request_id,
            caller: caller.to_string(),
            receiver: receiver.to_string(),
            shares,
            assets,
        });

        Ok((request_id, assets))
    }

    // -----------------------------------------------------------------------
    // Privileged Operations
    // -----------------------------------------------------------------------

    /// Replaces the reported NAV wholesale. Operator only.
    ///
    /// No bounds checking by design: NAV comes from real-world strategy
    /// valuation that only the operator can perform, so the operator is
    /// trusted outright. Honest reporting is an operational duty, not a
    /// ledger-enforced property.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unauthorized`] for non-operator callers.
    pub fn set_total_assets(&mut self, caller: &str, new_total_assets: u64) -> Result<(), VaultError> {
        self.check_operator(caller)?;

        let previous_total_assets = self.total_assets;
        self.total_assets = new_total_assets;
        self.updated_at = Utc::now();
        self.events.push(VaultEvent::TotalAssetsUpdated {
            previous_total_assets,
            new_total_assets,
        });
        Ok(())
    }

    /// Moves `amount` of the base asset out of custody to `to`, typically
    /// into an external yield strategy. Operator only.
    ///
    /// Deliberately has no accounting linkage: the operator reflects any
    /// resulting value change through
    /// [`set_total_assets`](Self::set_total_assets) later.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unauthorized`] for non-operator callers and
    /// [`VaultError::TransferFailed`] if the port declines.
    pub fn pull_underlying(
        &mut self,
        port: &mut dyn AssetTransferPort,
        caller: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), VaultError> {
        self.check_operator(caller)?;
        port.push_to(to, amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Acknowledges that a queued withdrawal has been settled off-chain.
    /// Operator only. Pure bookkeeping -- no funds move here.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unauthorized`] for non-operator callers,
    /// [`VaultError::RequestNotFound`] for a never-issued id, and
    /// [`VaultError::AlreadyProcessed`] on a second acknowledgment.
    pub fn mark_withdrawal_processed(
        &mut self,
        caller: &str,
        request_id: u64,
    ) -> Result<(), VaultError> {
        self.check_operator(caller)?;

        let request = self
            .withdrawal_requests
            .get_mut(request_id as usize)
            .ok_or(VaultError::RequestNotFound { request_id })?;
        if request.processed {
            return Err(VaultError::AlreadyProcessed { request_id });
        }

        request.processed = true;
        request.processed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self.events.push(VaultEvent::WithdrawalProcessed { request_id });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Operator-reported NAV in base-asset units.
    pub fn total_assets(&self) -> u64 {
        self.total_assets
    }

    /// Outstanding share supply, in share units.
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// `holder`'s share balance, zero if they have never held shares.
    pub fn balance_of(&self, holder: &str) -> u128 {
        self.share_balances.get(holder).copied().unwrap_or(0)
    }

    /// All non-zero share balances as `(holder, shares)` pairs.
    pub fn all_balances(&self) -> Vec<(String, u128)> {
        self.share_balances
            .iter()
            .filter(|(_, shares)| **shares > 0)
            .map(|(holder, shares)| (holder.clone(), *shares))
            .collect()
    }

    /// The withdrawal record for `request_id`, if that id was ever issued.
    pub fn withdrawal_request(&self, request_id: u64) -> Option<&WithdrawalRequest> {
        self.withdrawal_requests.get(request_id as usize)
    }

    /// The full withdrawal queue, settled records included, in request
    /// order.
    pub fn withdrawal_requests(&self) -> &[WithdrawalRequest] {
        &self.withdrawal_requests
    }

    /// Unsettled withdrawal records, in request order. This is the
    /// off-chain executor's worklist.
    pub fn pending_requests(&self) -> impl Iterator<Item = &WithdrawalRequest> {
        self.withdrawal_requests.iter().filter(|r| !r.processed)
    }

    /// The id the next redemption will receive.
    pub fn next_withdrawal_request_id(&self) -> u64 {
        self.withdrawal_requests.len() as u64
    }

    /// The current operator address.
    pub fn operator(&self) -> &str {
        self.gate.operator()
    }

    /// The vault's precision parameters.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Events accumulated since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Drains and returns the accumulated events.
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    /// When the ledger was constructed.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the most recent state change.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Hands the operator role to `new_operator`, through the gate's own
    /// protocol.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unauthorized`] unless `caller` is the current
    /// operator.
    pub fn transfer_operator(&mut self, caller: &str, new_operator: &str) -> Result<(), VaultError> {
        self.gate
            .transfer(caller, new_operator)
            .map_err(|_| VaultError::Unauthorized {
                caller: caller.to_string(),
            })?;
        self.updated_at = Utc::now();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    /// Validates the caller against the ownership gate.
    fn check_operator(&self, caller: &str) -> Result<(), VaultError> {
        if !self.gate.is_authorized(caller) {
            return Err(VaultError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
