//! Bookkeeping orchestration layer
//!
//! This module ties together the snapshot store, the posting engine, the
//! credential verifier and metrics into a high-level API. Every command runs a
//! pure posting function and hands the resulting snapshot to the store; if
//! the write fails the previous snapshot stays current.
//!
//! # Example
//!
//! ```no_run
//! use books_core::{Books, Config};
//! use books_core::report::Period;
//!
//! fn main() -> books_core::Result<()> {
//!     let books = Books::open(Config::default())?;
//!     let report = books.summarize(Period::all());
//!     println!("net profit: {}", report.net_profit);
//!     Ok(())
//! }
//! ```

use crate::{
    auth::{self, Argon2Verifier, CredentialVerifier},
    backup, master,
    master::{PartyDraft, ProductDraft, UserDraft},
    metrics::Metrics,
    posting::{
        self, InvoiceDraft, Posting, PostingStatus, PostingWarning, TransferDraft, TreasuryDraft,
    },
    report::{self, DashboardStats, Period, ProfitReport},
    storage::{open_backend, Backend},
    store::{SnapshotStore, StatePatch},
    types::{
        AppState, CompanyInfo, Invoice, InvoiceId, Party, PartyId, Product, ProductId, Role,
        Transfer, TreasuryId, TreasuryTransaction, User, UserId,
    },
    Config, Error, Result,
};
use std::io::{Read, Write};

/// Result of a committed command
#[derive(Debug, Clone)]
pub struct Committed<T> {
    /// Created or affected record
    pub output: T,
    /// Effects that were skipped
    pub warnings: Vec<PostingWarning>,
}

impl<T> Committed<T> {
    /// Applied or applied-with-warnings
    pub fn status(&self) -> PostingStatus {
        if self.warnings.is_empty() {
            PostingStatus::Applied
        } else {
            PostingStatus::AppliedWithWarnings
        }
    }
}

/// Main bookkeeping interface
pub struct Books {
    /// Authoritative snapshot
    store: SnapshotStore,

    /// Password hashing
    verifier: Box<dyn CredentialVerifier>,

    /// Prometheus collectors
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Books {
    /// Open with the configured backend and Argon2 credentials
    pub fn open(config: Config) -> Result<Self> {
        let backend = open_backend(&config.storage)?;
        Self::with_backend(config, backend, Box::new(Argon2Verifier))
    }

    /// Open over an explicit backend and verifier
    pub fn with_backend(
        config: Config,
        backend: Box<dyn Backend>,
        verifier: Box<dyn CredentialVerifier>,
    ) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;
        let store = SnapshotStore::open(backend, &config.seed, verifier.as_ref())?;
        metrics.record_persist(store.last_write_seconds(), store.last_write_bytes());

        Ok(Self {
            store,
            verifier,
            metrics,
            config,
        })
    }

    /// Current snapshot
    pub fn state(&self) -> &AppState {
        self.store.current()
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn commit<T>(&mut self, posting: Posting<T>) -> Result<Committed<T>> {
        self.store.replace(posting.state)?;
        self.record_persist();
        Ok(Committed {
            output: posting.output,
            warnings: posting.warnings,
        })
    }

    fn merge(&mut self, patch: StatePatch) -> Result<()> {
        self.store.merge(patch)?;
        self.record_persist();
        Ok(())
    }

    fn record_persist(&self) {
        self.metrics
            .record_persist(self.store.last_write_seconds(), self.store.last_write_bytes());
    }

    /// Save a new invoice or re-save an existing one
    pub fn post_invoice(&mut self, draft: InvoiceDraft) -> Result<Committed<Invoice>> {
        let posting = posting::post_invoice(self.state(), draft)?;
        let committed = self.commit(posting)?;
        self.metrics.record_invoice_posted(committed.warnings.len());

        for warning in &committed.warnings {
            tracing::warn!(invoice_id = %committed.output.id, %warning, "Posting effect skipped");
        }
        Ok(committed)
    }

    /// Delete an invoice and reverse its effects
    pub fn delete_invoice(&mut self, id: &InvoiceId) -> Result<Committed<Invoice>> {
        let posting = posting::delete_invoice(self.state(), id)?;
        let committed = self.commit(posting)?;
        self.metrics.record_invoice_deleted(committed.warnings.len());
        Ok(committed)
    }

    /// Move balance between two parties
    pub fn transfer_balance(&mut self, draft: TransferDraft) -> Result<Committed<Transfer>> {
        let posting = posting::transfer_balance(self.state(), draft)?;
        let committed = self.commit(posting)?;
        self.metrics.record_transfer();
        Ok(committed)
    }

    /// Add a manual cash entry
    pub fn record_treasury(
        &mut self,
        draft: TreasuryDraft,
    ) -> Result<Committed<TreasuryTransaction>> {
        let posting = posting::record_treasury(self.state(), draft)?;
        let committed = self.commit(posting)?;
        self.metrics.record_treasury_entry();
        Ok(committed)
    }

    /// Remove a cash entry
    pub fn remove_treasury(&mut self, id: &TreasuryId) -> Result<Committed<TreasuryTransaction>> {
        let posting = posting::remove_treasury(self.state(), id)?;
        self.commit(posting)
    }

    /// Add a party
    pub fn add_party(&mut self, draft: PartyDraft) -> Result<Committed<Party>> {
        let posting = master::add_party(self.state(), draft)?;
        let committed = self.commit(posting)?;
        tracing::info!(party_id = %committed.output.id, name = %committed.output.name, "Party added");
        Ok(committed)
    }

    /// Append a confirmed batch of previewed parties
    pub fn import_parties(&mut self, parties: Vec<Party>) -> Result<Committed<usize>> {
        let posting = master::import_parties(self.state(), parties)?;
        let committed = self.commit(posting)?;
        tracing::info!(count = committed.output, "Parties imported");
        Ok(committed)
    }

    /// Remove a party
    pub fn remove_party(&mut self, id: &PartyId) -> Result<Committed<Party>> {
        let posting = master::remove_party(self.state(), id)?;
        self.commit(posting)
    }

    /// Add a product
    pub fn add_product(&mut self, draft: ProductDraft) -> Result<Committed<Product>> {
        let posting = master::add_product(self.state(), draft)?;
        let committed = self.commit(posting)?;
        tracing::info!(code = %committed.output.code, "Product added");
        Ok(committed)
    }

    /// Remove a product
    pub fn remove_product(&mut self, id: &ProductId) -> Result<Committed<Product>> {
        let posting = master::remove_product(self.state(), id)?;
        self.commit(posting)
    }

    /// Add a user; the password is hashed before it is stored
    pub fn add_user(
        &mut self,
        username: &str,
        password: &str,
        role: Role,
        permissions: Vec<String>,
    ) -> Result<Committed<User>> {
        if password.is_empty() {
            return Err(Error::Validation("Password is required".to_string()));
        }
        let draft = UserDraft {
            username: username.to_string(),
            password_hash: self.verifier.hash(password)?,
            role,
            permissions,
        };
        let posting = master::add_user(self.state(), draft)?;
        let committed = self.commit(posting)?;
        tracing::info!(username, role = ?role, "User added");
        Ok(committed)
    }

    /// Remove a user
    pub fn remove_user(&mut self, id: &UserId) -> Result<Committed<User>> {
        let posting = master::remove_user(self.state(), id)?;
        self.commit(posting)
    }

    /// Check credentials
    pub fn login(&self, username: &str, password: &str) -> Result<User> {
        auth::authenticate(&self.state().users, username, password, self.verifier.as_ref())
            .cloned()
    }

    /// Rehash plaintext passwords left by older snapshots
    pub fn upgrade_legacy_credentials(&mut self) -> Result<usize> {
        let mut users = self.state().users.clone();
        let upgraded = auth::upgrade_legacy_credentials(&mut users, self.verifier.as_ref())?;
        if upgraded > 0 {
            self.merge(StatePatch {
                users: Some(users),
                ..StatePatch::default()
            })?;
            tracing::info!(upgraded, "Upgraded legacy credentials");
        }
        Ok(upgraded)
    }

    /// Replace the company letterhead
    pub fn update_company_info(&mut self, info: CompanyInfo) -> Result<()> {
        self.merge(StatePatch::company_info(info))
    }

    /// Replace the party categories
    pub fn set_categories(&mut self, categories: Vec<String>) -> Result<()> {
        self.merge(StatePatch::categories(categories))
    }

    /// Replace the whole snapshot with a backup
    ///
    /// Destructive: nothing of the current snapshot survives. Refused unless
    /// `confirmed` is set.
    pub fn restore_backup(&mut self, state: AppState, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(Error::Validation(
                "Restoring a backup overwrites all data and must be confirmed".to_string(),
            ));
        }

        tracing::warn!(
            parties = state.parties.len(),
            invoices = state.invoices.len(),
            "Restoring backup over current snapshot"
        );
        self.store.replace(state)?;
        self.record_persist();
        Ok(())
    }

    /// Parse a backup document, then restore it
    pub fn restore_backup_from<R: Read>(&mut self, reader: R, confirmed: bool) -> Result<()> {
        let state = backup::parse_backup(reader)?;
        self.restore_backup(state, confirmed)
    }

    /// Write the current snapshot as a backup document
    pub fn export_backup<W: Write>(&self, writer: W) -> Result<()> {
        backup::export_backup(self.state(), writer)
    }

    /// Profit report for a period
    pub fn summarize(&self, period: Period) -> ProfitReport {
        report::summarize(self.state(), period)
    }

    /// Dashboard numbers with the configured low-stock threshold
    pub fn dashboard(&self) -> DashboardStats {
        DashboardStats::compute(self.state(), self.config.reporting.low_stock_threshold)
    }
}

impl std::fmt::Debug for Books {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Books")
            .field("store", &self.store)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
