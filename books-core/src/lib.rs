//! Arkan Books Core
//!
//! Single-tenant bookkeeping: parties, inventory, invoices, cash and balance
//! transfers, with a profit report derived from them.
//!
//! # Architecture
//!
//! - **Snapshot**: the whole database is one [`AppState`] value
//! - **Pure posting**: every command computes a new snapshot from the old one
//! - **Single writer**: the [`SnapshotStore`] is replaced wholesale, never patched in place
//! - **Read-only reports**: folds over a borrowed snapshot
//!
//! # Invariants
//!
//! - A posting is applied completely or not at all
//! - Re-saving an unchanged invoice leaves every balance where it was
//! - A balance transfer preserves the sum of party balances
//! - A failed persist leaves the previous snapshot current

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, clippy::all)]

pub mod types;
pub mod primitives;
pub mod posting;
pub mod master;
pub mod storage;
pub mod store;
pub mod report;
pub mod backup;
pub mod import;
pub mod auth;
pub mod books;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    AppState, Direction, Invoice, InvoiceId, InvoiceItem, InvoiceType, Party, PartyId, PartyKind,
    Product, ProductId, TreasuryTransaction, User,
};
pub use posting::{InvoiceDraft, PostingStatus, PostingWarning, TransferDraft, TreasuryDraft};
pub use store::SnapshotStore;
pub use books::{Books, Committed};
pub use config::Config;
