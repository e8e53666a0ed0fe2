//! Snapshot store
//!
//! Holds the one authoritative [`AppState`] and persists it verbatim on every
//! change. The new document is written before the in-memory snapshot is
//! swapped, so a failed write leaves both the durable and the in-memory state
//! at the previous version.

use crate::{
    auth::CredentialVerifier,
    config::SeedConfig,
    storage::Backend,
    types::{
        AppState, CompanyInfo, Invoice, Party, Product, Role, Transfer, TreasuryTransaction, User,
        UserId,
    },
    Result,
};
use std::time::Instant;

/// Top-level fields to shallow-merge into the snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    /// Replace users
    pub users: Option<Vec<User>>,
    /// Replace parties
    pub parties: Option<Vec<Party>>,
    /// Replace products
    pub products: Option<Vec<Product>>,
    /// Replace invoices
    pub invoices: Option<Vec<Invoice>>,
    /// Replace treasury
    pub treasury: Option<Vec<TreasuryTransaction>>,
    /// Replace transfers
    pub transfers: Option<Vec<Transfer>>,
    /// Replace company info
    pub company_info: Option<CompanyInfo>,
    /// Replace categories
    pub categories: Option<Vec<String>>,
}

impl StatePatch {
    /// Patch that only replaces the company info
    pub fn company_info(info: CompanyInfo) -> Self {
        Self {
            company_info: Some(info),
            ..Self::default()
        }
    }

    /// Patch that only replaces the categories
    pub fn categories(categories: Vec<String>) -> Self {
        Self {
            categories: Some(categories),
            ..Self::default()
        }
    }

    /// Apply on top of a snapshot
    pub fn apply(self, mut state: AppState) -> AppState {
        if let Some(users) = self.users {
            state.users = users;
        }
        if let Some(parties) = self.parties {
            state.parties = parties;
        }
        if let Some(products) = self.products {
            state.products = products;
        }
        if let Some(invoices) = self.invoices {
            state.invoices = invoices;
        }
        if let Some(treasury) = self.treasury {
            state.treasury = treasury;
        }
        if let Some(transfers) = self.transfers {
            state.transfers = transfers;
        }
        if let Some(company_info) = self.company_info {
            state.company_info = company_info;
        }
        if let Some(categories) = self.categories {
            state.categories = categories;
        }
        state
    }
}

/// Snapshot for a store that has never been written
pub fn seed_state(seed: &SeedConfig, verifier: &dyn CredentialVerifier) -> Result<AppState> {
    let admin = User {
        id: UserId::new("1"),
        username: seed.admin_username.clone(),
        password: None,
        password_hash: Some(verifier.hash(&seed.admin_password)?),
        role: Role::Admin,
        permissions: Role::Admin.default_permissions(),
    };

    Ok(AppState {
        users: vec![admin],
        company_info: seed.company.clone(),
        categories: seed.categories.clone(),
        ..AppState::default()
    })
}

/// Single authoritative snapshot plus its durable copy
pub struct SnapshotStore {
    backend: Box<dyn Backend>,
    current: AppState,
    last_write_bytes: usize,
    last_write_seconds: f64,
}

impl SnapshotStore {
    /// Load the persisted snapshot, or seed and persist a new one
    pub fn open(
        backend: Box<dyn Backend>,
        seed: &SeedConfig,
        verifier: &dyn CredentialVerifier,
    ) -> Result<Self> {
        let loaded = match backend.read()? {
            Some(bytes) => Some(serde_json::from_slice::<AppState>(&bytes)?),
            None => None,
        };

        let mut store = Self {
            backend,
            current: AppState::default(),
            last_write_bytes: 0,
            last_write_seconds: 0.0,
        };

        match loaded {
            Some(state) => {
                tracing::info!(
                    backend = %store.backend.describe(),
                    parties = state.parties.len(),
                    products = state.products.len(),
                    invoices = state.invoices.len(),
                    "Loaded snapshot"
                );
                store.current = state;
            }
            None => {
                tracing::info!(backend = %store.backend.describe(), "No snapshot found, seeding");
                store.replace(seed_state(seed, verifier)?)?;
            }
        }

        Ok(store)
    }

    /// Current snapshot
    pub fn current(&self) -> &AppState {
        &self.current
    }

    /// Persist `state` and make it current
    pub fn replace(&mut self, state: AppState) -> Result<()> {
        let started = Instant::now();
        let bytes = serde_json::to_vec(&state)?;
        self.backend.write(&bytes)?;

        self.last_write_bytes = bytes.len();
        self.last_write_seconds = started.elapsed().as_secs_f64();
        self.current = state;
        Ok(())
    }

    /// Shallow-merge top-level fields, then persist
    pub fn merge(&mut self, patch: StatePatch) -> Result<()> {
        let next = patch.apply(self.current.clone());
        self.replace(next)
    }

    /// Size of the last persisted document
    pub fn last_write_bytes(&self) -> usize {
        self.last_write_bytes
    }

    /// Duration of the last persist
    pub fn last_write_seconds(&self) -> f64 {
        self.last_write_seconds
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("backend", &self.backend.describe())
            .field("last_write_bytes", &self.last_write_bytes)
            .finish_non_exhaustive()
    }
}
