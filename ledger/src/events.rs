//! # Observable Events
//!
//! Every state-changing vault operation appends one [`VaultEvent`] to the
//! ledger's event log. Off-chain consumers (indexers, the settlement
//! executor, dashboards) drain the log and never need to diff raw state.
//!
//! Events are plain serializable records. The tagged JSON encoding makes
//! them self-describing on the wire:
//!
//! ```json
//! {"type":"deposit","caller":"alice","receiver":"alice","assets":100,"shares":100000000000000}
//! ```

use serde::{Deserialize, Serialize};

/// A fact about a completed vault operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// Assets came in, shares went out.
    Deposit {
        /// Who paid the assets in.
        caller: String,
        /// Who received the minted shares.
        receiver: String,
        /// Asset amount pulled, in base-asset units.
        assets: u64,
        /// Shares minted, in share units.
        shares: u128,
    },

    /// Shares were burned and a settlement obligation queued.
    WithdrawalRequested {
        /// Identifier of the new queue record.
        request_id: u64,
        /// Who burned the shares.
        caller: String,
        /// Who the settled assets are owed to.
        receiver: String,
        /// Shares burned.
        shares: u128,
        /// Asset amount owed, fixed at request time.
        assets: u64,
    },

    /// The operator acknowledged off-chain settlement of a queued request.
    WithdrawalProcessed {
        /// Identifier of the settled record.
        request_id: u64,
    },

    /// The operator re-reported the vault's net asset value.
    TotalAssetsUpdated {
        /// NAV before the update.
        previous_total_assets: u64,
        /// NAV after the update.
        new_total_assets: u64,
    },
}
