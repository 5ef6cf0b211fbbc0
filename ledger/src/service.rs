//! # Vault Service
//!
//! The ledger's formulas assume no other call can observe or mutate
//! `total_assets` / `total_shares` mid-computation. Hosts with a serialized
//! execution model get that for free; a conventional multi-threaded server
//! does not. [`VaultService`] restores the guarantee with the bluntest
//! possible instrument: one `parking_lot::Mutex` around the ledger *and*
//! its asset port, so every operation -- external transfer included -- runs
//! under a single writer.
//!
//! This is also where structured logging lives. The ledger itself stays
//! silent so it can be embedded anywhere; the service narrates accepted and
//! rejected operations via `tracing`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::events::VaultEvent;
use crate::ports::AssetTransferPort;
use crate::vault::{VaultError, VaultLedger, WithdrawalRequest};

struct ServiceInner<P> {
    ledger: VaultLedger,
    port: P,
}

/// A cloneable, thread-safe handle to a vault and its asset port.
///
/// All mutating methods take `&self`; serialization happens inside. Clones
/// share the same underlying vault.
pub struct VaultService<P> {
    inner: Arc<Mutex<ServiceInner<P>>>,
}

impl<P> Clone for VaultService<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: AssetTransferPort> VaultService<P> {
    /// Wraps a ledger and its asset port behind one lock.
    pub fn new(ledger: VaultLedger, port: P) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ServiceInner { ledger, port })),
        }
    }

    /// See [`VaultLedger::deposit`].
    pub fn deposit(&self, caller: &str, receiver: &str, assets: u64) -> Result<u128, VaultError> {
        let mut guard = self.inner.lock();
        let ServiceInner { ledger, port } = &mut *guard;
        match ledger.deposit(port, caller, receiver, assets) {
            Ok(shares) => {
                info!(caller, receiver, assets, shares = %shares, "deposit accepted");
                Ok(shares)
            }
            Err(e) => {
                warn!(caller, receiver, assets, error = %e, "deposit rejected");
                Err(e)
            }
        }
    }

    /// See [`VaultLedger::redeem_request`].
    pub fn redeem_request(
        &self,
        caller: &str,
        receiver: &str,
        shares: u128,
    ) -> Result<(u64, u64), VaultError> {
        let mut guard = self.inner.lock();
        match guard.ledger.redeem_request(caller, receiver, shares) {
            Ok((request_id, assets)) => {
                info!(
                    caller,
                    receiver,
                    request_id,
                    shares = %shares,
                    assets,
                    "withdrawal queued"
                );
                Ok((request_id, assets))
            }
            Err(e) => {
                warn!(caller, receiver, shares = %shares, error = %e, "redemption rejected");
                Err(e)
            }
        }
    }

    /// See [`VaultLedger::set_total_assets`].
    pub fn set_total_assets(&self, caller: &str, new_total_assets: u64) -> Result<(), VaultError> {
        let mut guard = self.inner.lock();
        let previous = guard.ledger.total_assets();
        guard.ledger.set_total_assets(caller, new_total_assets)?;
        info!(caller, previous, new_total_assets, "NAV re-reported");
        Ok(())
    }

    /// See [`VaultLedger::pull_underlying`].
    pub fn pull_underlying(&self, caller: &str, to: &str, amount: u64) -> Result<(), VaultError> {
        let mut guard = self.inner.lock();
        let ServiceInner { ledger, port } = &mut *guard;
        ledger.pull_underlying(port, caller, to, amount)?;
        info!(caller, to, amount, "underlying pulled to external strategy");
        Ok(())
    }

    /// See [`VaultLedger::mark_withdrawal_processed`].
    pub fn mark_withdrawal_processed(&self, caller: &str, request_id: u64) -> Result<(), VaultError> {
        let mut guard = self.inner.lock();
        guard.ledger.mark_withdrawal_processed(caller, request_id)?;
        info!(caller, request_id, "withdrawal settlement acknowledged");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read Surface
    // -----------------------------------------------------------------------

    /// Operator-reported NAV in base-asset units.
    pub fn total_assets(&self) -> u64 {
        self.inner.lock().ledger.total_assets()
    }

    /// Outstanding share supply, in share units.
    pub fn total_shares(&self) -> u128 {
        self.inner.lock().ledger.total_shares()
    }

    /// Current share price; see [`VaultLedger::price_per_share`].
    pub fn price_per_share(&self) -> Result<u128, VaultError> {
        self.inner.lock().ledger.price_per_share()
    }

    /// `holder`'s share balance.
    pub fn balance_of(&self, holder: &str) -> u128 {
        self.inner.lock().ledger.balance_of(holder)
    }

    /// A copy of the withdrawal record for `request_id`, if it exists.
    pub fn withdrawal_request(&self, request_id: u64) -> Option<WithdrawalRequest> {
        self.inner.lock().ledger.withdrawal_request(request_id).cloned()
    }

    /// Copies of the unsettled records, in request order.
    pub fn pending_requests(&self) -> Vec<WithdrawalRequest> {
        self.inner.lock().ledger.pending_requests().cloned().collect()
    }

    /// The id the next redemption will receive.
    pub fn next_withdrawal_request_id(&self) -> u64 {
        self.inner.lock().ledger.next_withdrawal_request_id()
    }

    /// Drains the ledger's accumulated events for off-chain consumption.
    pub fn drain_events(&self) -> Vec<VaultEvent> {
        self.inner.lock().ledger.take_events()
    }

    /// A point-in-time copy of the whole ledger, for snapshots and
    /// persistence.
    pub fn snapshot(&self) -> VaultLedger {
        self.inner.lock().ledger.clone()
    }

    /// Runs `f` against the asset port under the service lock. Test and
    /// simulation hook -- production ports are driven by the vault
    /// operations themselves.
    pub fn with_port<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.inner.lock().port)
    }
}
