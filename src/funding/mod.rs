//! Funding core: the only code allowed to move money fields.
//!
//! - [`reward_ledger`] validates reward tiers and reserves units.
//! - [`campaign_ledger`] applies contributions and evaluates lifecycle status.
//! - [`coordinator`] runs one donation as a single store transaction.
//!
//! Store methods that write `current_amount`, `status`,
//! `quantity_claimed`, or insert donations take a [`LedgerWrite`]. Its
//! constructor is private to this module, so no other part of the crate
//! can reach those writes.

pub mod campaign_ledger;
pub mod coordinator;
pub mod reward_ledger;

pub use campaign_ledger::{ContributionOutcome, FundingSnapshot, LifecycleRefresh, StatusTransition};
pub use coordinator::{DonationCoordinator, DonationReceipt, DonationRequest};

/// Capability token for funding writes. Only [`crate::funding`] can mint one.
#[derive(Debug)]
pub struct LedgerWrite {
    _sealed: (),
}

impl LedgerWrite {
    pub(in crate::funding) const fn issue() -> Self {
        Self { _sealed: () }
    }

    #[cfg(test)]
    pub(crate) const fn for_tests() -> Self {
        Self::issue()
    }
}
