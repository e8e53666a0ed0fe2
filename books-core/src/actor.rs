//! Actor-based single writer for the books
//!
//! When the books sit behind a network or multi-task front end, every
//! posting must run alone over the full snapshot. This module moves a
//! [`Books`] into one Tokio task and serializes all commands through its
//! mailbox:
//! - One logical writer, so postings never interleave
//! - Bounded mailbox gives callers backpressure
//! - Every command answers over its own oneshot channel
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Front end (HTTP, gRPC, UI)               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               BooksHandle (Clone)                     │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              BooksActor (Single Task)                 │
//! │    posting fn → SnapshotStore::replace() → reply     │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{
    books::{Books, Committed},
    posting::{InvoiceDraft, TransferDraft, TreasuryDraft},
    report::{DashboardStats, Period, ProfitReport},
    types::{AppState, Invoice, InvoiceId, Party, Transfer, TreasuryTransaction, User},
    Error, Result,
};
use tokio::sync::{mpsc, oneshot};

/// Message sent to the books actor
pub enum BooksMessage {
    /// Save or re-save an invoice
    PostInvoice {
        draft: InvoiceDraft,
        response: oneshot::Sender<Result<Committed<Invoice>>>,
    },

    /// Delete an invoice
    DeleteInvoice {
        id: InvoiceId,
        response: oneshot::Sender<Result<Committed<Invoice>>>,
    },

    /// Move balance between parties
    TransferBalance {
        draft: TransferDraft,
        response: oneshot::Sender<Result<Committed<Transfer>>>,
    },

    /// Manual cash entry
    RecordTreasury {
        draft: TreasuryDraft,
        response: oneshot::Sender<Result<Committed<TreasuryTransaction>>>,
    },

    /// Append previewed parties
    ImportParties {
        parties: Vec<Party>,
        response: oneshot::Sender<Result<Committed<usize>>>,
    },

    /// Check credentials
    Login {
        username: String,
        password: String,
        response: oneshot::Sender<Result<User>>,
    },

    /// Copy of the current snapshot
    Snapshot {
        response: oneshot::Sender<AppState>,
    },

    /// Profit report
    Summarize {
        period: Period,
        response: oneshot::Sender<ProfitReport>,
    },

    /// Dashboard numbers
    Dashboard {
        response: oneshot::Sender<DashboardStats>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the books
pub struct BooksActor {
    /// The only writer of the snapshot
    books: Books,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<BooksMessage>,
}

impl BooksActor {
    /// Create new actor
    pub fn new(books: Books, mailbox: mpsc::Receiver<BooksMessage>) -> Self {
        Self { books, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let BooksMessage::Shutdown = msg {
                tracing::info!("Books actor shutting down");
                break;
            }
            self.handle_message(msg);
        }
    }

    /// Handle a single message; dropped receivers are ignored
    fn handle_message(&mut self, msg: BooksMessage) {
        match msg {
            BooksMessage::PostInvoice { draft, response } => {
                let _ = response.send(self.books.post_invoice(draft));
            }

            BooksMessage::DeleteInvoice { id, response } => {
                let _ = response.send(self.books.delete_invoice(&id));
            }

            BooksMessage::TransferBalance { draft, response } => {
                let _ = response.send(self.books.transfer_balance(draft));
            }

            BooksMessage::RecordTreasury { draft, response } => {
                let _ = response.send(self.books.record_treasury(draft));
            }

            BooksMessage::ImportParties { parties, response } => {
                let _ = response.send(self.books.import_parties(parties));
            }

            BooksMessage::Login {
                username,
                password,
                response,
            } => {
                let _ = response.send(self.books.login(&username, &password));
            }

            BooksMessage::Snapshot { response } => {
                let _ = response.send(self.books.state().clone());
            }

            BooksMessage::Summarize { period, response } => {
                let _ = response.send(self.books.summarize(period));
            }

            BooksMessage::Dashboard { response } => {
                let _ = response.send(self.books.dashboard());
            }

            BooksMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct BooksHandle {
    sender: mpsc::Sender<BooksMessage>,
}

impl BooksHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<BooksMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> BooksMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Save or re-save an invoice
    pub async fn post_invoice(&self, draft: InvoiceDraft) -> Result<Committed<Invoice>> {
        self.request(|response| BooksMessage::PostInvoice { draft, response })
            .await?
    }

    /// Delete an invoice
    pub async fn delete_invoice(&self, id: InvoiceId) -> Result<Committed<Invoice>> {
        self.request(|response| BooksMessage::DeleteInvoice { id, response })
            .await?
    }

    /// Move balance between parties
    pub async fn transfer_balance(&self, draft: TransferDraft) -> Result<Committed<Transfer>> {
        self.request(|response| BooksMessage::TransferBalance { draft, response })
            .await?
    }

    /// Manual cash entry
    pub async fn record_treasury(
        &self,
        draft: TreasuryDraft,
    ) -> Result<Committed<TreasuryTransaction>> {
        self.request(|response| BooksMessage::RecordTreasury { draft, response })
            .await?
    }

    /// Append previewed parties
    pub async fn import_parties(&self, parties: Vec<Party>) -> Result<Committed<usize>> {
        self.request(|response| BooksMessage::ImportParties { parties, response })
            .await?
    }

    /// Check credentials
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let username = username.to_string();
        let password = password.to_string();
        self.request(|response| BooksMessage::Login {
            username,
            password,
            response,
        })
        .await?
    }

    /// Copy of the current snapshot
    pub async fn snapshot(&self) -> Result<AppState> {
        self.request(|response| BooksMessage::Snapshot { response })
            .await
    }

    /// Profit report
    pub async fn summarize(&self, period: Period) -> Result<ProfitReport> {
        self.request(|response| BooksMessage::Summarize { period, response })
            .await
    }

    /// Dashboard numbers
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        self.request(|response| BooksMessage::Dashboard { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(BooksMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the books actor
pub fn spawn_books_actor(books: Books, mailbox_size: usize) -> BooksHandle {
    let (tx, rx) = mpsc::channel(mailbox_size); // Bounded channel for backpressure
    let actor = BooksActor::new(books, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    BooksHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::Argon2Verifier,
        master::PartyDraft,
        storage::MemoryBackend,
        types::{PartyId, PartyKind},
        Config,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn books_with_parties() -> (Books, PartyId, PartyId) {
        let mut books = Books::with_backend(
            Config::default(),
            Box::new(MemoryBackend::new()),
            Box::new(Argon2Verifier),
        )
        .unwrap();

        let mut add = |name: &str| {
            books
                .add_party(PartyDraft {
                    code: String::new(),
                    name: name.to_string(),
                    kind: PartyKind::Customer,
                    category: String::new(),
                    phone: String::new(),
                    opening_balance: Decimal::from(100),
                })
                .unwrap()
                .output
                .id
        };
        let a = add("A");
        let b = add("B");
        (books, a, b)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (books, _, _) = books_with_parties();
        let handle = spawn_books_actor(books, 16);

        assert_eq!(handle.snapshot().await.unwrap().parties.len(), 2);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_transfers_conserve_balance() {
        let (books, a, b) = books_with_parties();
        let handle = spawn_books_actor(books, 4);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let handle = handle.clone();
            let (from, to) = if i % 2 == 0 {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            };
            tasks.push(tokio::spawn(async move {
                handle
                    .transfer_balance(TransferDraft {
                        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                        from_party_id: from,
                        to_party_id: to,
                        amount: Decimal::from(i + 1),
                        reason: String::new(),
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.transfers.len(), 20);
        assert_eq!(state.total_party_balance(), Decimal::from(200));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_errors_travel_back() {
        let (books, a, _) = books_with_parties();
        let handle = spawn_books_actor(books, 4);

        let err = handle
            .transfer_balance(TransferDraft {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                from_party_id: a.clone(),
                to_party_id: a,
                amount: Decimal::ONE,
                reason: String::new(),
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(handle.login("admin", "123").await.is_ok());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_shutdown() {
        let (books, _, _) = books_with_parties();
        let handle = spawn_books_actor(books, 4);
        handle.shutdown().await.unwrap();
        tokio::task::yield_now().await;

        let result = handle.dashboard().await;
        assert!(matches!(result, Err(Error::Concurrency(_))));
    }
}
