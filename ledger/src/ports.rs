//! # External Capabilities
//!
//! The vault composes with exactly two things it does not own: the base
//! asset (an [`AssetTransferPort`]) and the privileged operator identity
//! (an [`OwnershipGate`]). Both are deliberately tiny traits -- the ledger
//! never learns how the asset moves or how the operator authenticates, it
//! only consumes the capability.
//!
//! A port implementation must be failure-safe: when a transfer call returns
//! an error, no balance anywhere may have changed. The ledger relies on this
//! to guarantee that a rejected deposit leaves no residue.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Asset Transfer Port
// ---------------------------------------------------------------------------

/// Returned by a port when it declines to move funds.
///
/// The reason string is for operators and logs; the ledger treats every
/// decline identically (the whole operation aborts).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("asset transfer declined: {0}")]
pub struct TransferDeclined(pub String);

/// Moves the base asset between external holders and the vault's custody.
///
/// Both methods are all-or-nothing: an `Err` return guarantees that no
/// balance changed.
pub trait AssetTransferPort {
    /// Pulls `amount` of the base asset from `holder` into vault custody.
    /// Requires whatever prior authorization the asset demands (allowance,
    /// signed intent, ...) -- that handshake is the port's problem.
    fn pull_from(&mut self, holder: &str, amount: u64) -> Result<(), TransferDeclined>;

    /// Pushes `amount` of the base asset out of vault custody to
    /// `recipient`.
    fn push_to(&mut self, recipient: &str, amount: u64) -> Result<(), TransferDeclined>;
}

// ---------------------------------------------------------------------------
// Ownership Gate
// ---------------------------------------------------------------------------

/// Errors from the gate's own ownership protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    /// The caller attempting an ownership transfer is not the current
    /// operator.
    #[error("caller '{0}' is not the current operator")]
    NotOperator(String),
}

/// Restricts privileged vault operations to a designated identity.
///
/// The ledger calls [`is_authorized`](Self::is_authorized) at the top of
/// every privileged operation and cares about nothing else. How the
/// identity is established (key signature, session auth, ...) lives outside
/// the ledger.
pub trait OwnershipGate {
    /// Returns `true` if `caller` may perform privileged operations.
    fn is_authorized(&self, caller: &str) -> bool;
}

/// The simplest possible gate: one operator address, compared literally.
///
/// Ownership is transferable, but only through the gate's own protocol
/// ([`transfer`](Self::transfer)) -- the vault exposes no operation for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SingleOperator {
    operator: String,
}

impl SingleOperator {
    /// Creates a gate with the given operator address.
    pub fn new(operator: &str) -> Self {
        Self {
            operator: operator.to_string(),
        }
    }

    /// Returns the current operator address.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Hands the operator role to `new_operator`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NotOperator`] unless `caller` is the current
    /// operator.
    pub fn transfer(&mut self, caller: &str, new_operator: &str) -> Result<(), GateError> {
        if caller != self.operator {
            return Err(GateError::NotOperator(caller.to_string()));
        }
        self.operator = new_operator.to_string();
        Ok(())
    }
}

impl OwnershipGate for SingleOperator {
    fn is_authorized(&self, caller: &str) -> bool {
        caller == self.operator
    }
}

// ---------------------------------------------------------------------------
// In-Memory Reference Asset
// ---------------------------------------------------------------------------

/// An in-memory base asset implementing [`AssetTransferPort`].
///
/// Tracks per-holder balances plus a dedicated custody account for the
/// vault. Used by the test suites and by embedding hosts that simulate the
/// asset locally; a production deployment supplies a port backed by the
/// real token instead.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryAsset {
    /// Per-holder balances in the asset's smallest unit.
    balances: HashMap<String, u64>,
    /// Units currently held in vault custody.
    custody: u64,
}

impl InMemoryAsset {
    /// Creates an asset with no balances anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `holder` out of thin air. Test fixture;
    /// saturates rather than panicking on absurd totals.
    pub fn mint(&mut self, holder: &str, amount: u64) {
        let balance = self.balances.entry(holder.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Returns `holder`'s balance.
    pub fn balance_of(&self, holder: &str) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Returns the amount sitting in vault custody.
    pub fn custody(&self) -> u64 {
        self.custody
    }
}

impl AssetTransferPort for InMemoryAsset {
    fn pull_from(&mut self, holder: &str, amount: u64) -> Result<(), TransferDeclined> {
        let balance = self.balances.get_mut(holder).filter(|b| **b >= amount).ok_or_else(|| {
            TransferDeclined(format!("holder '{holder}' lacks {amount} units"))
        })?;
        *balance -= amount;
        self.custody += amount;
        Ok(())
    }

    fn push_to(&mut self, recipient: &str, amount: u64) -> Result<(), TransferDeclined> {
        if self.custody < amount {
            return Err(TransferDeclined(format!(
                "custody holds {} units, {amount} requested",
                self.custody
            )));
        }
        self.custody -= amount;
        *self.balances.entry(recipient.to_string()).or_insert(0) += amount;
        Ok(())
    }
}
