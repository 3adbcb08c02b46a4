pub mod accounts;
pub mod models;

pub use models::{
    Account, AccountKind, LedgerEntry, LedgerEntryType, SpendRequest, SpendRequestStatus,
    SyncStatus, WalletRecord,
};
