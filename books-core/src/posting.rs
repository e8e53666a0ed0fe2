//! Posting engine
//!
//! Every operation here is a pure function `(&AppState, draft) -> Posting`:
//! the input snapshot is never touched, and the returned snapshot carries all
//! effects of the document at once. A validation failure returns `Err` and no
//! snapshot at all, so callers can never observe a half-applied posting.
//!
//! # Invoice effects
//!
//! | Type           | Stock            | Avg cost  | Party balance     | Cash |
//! |----------------|------------------|-----------|-------------------|------|
//! | Sale           | `-= qty`         | unchanged | `+= total - paid` | In   |
//! | PurchaseReturn | `-= qty`         | unchanged | `+= total - paid` | In   |
//! | Purchase       | `+= qty`         | weighted  | `-= total - paid` | Out  |
//! | SaleReturn     | `+= qty`         | unchanged | `-= total - paid` | Out  |
//!
//! Saving an invoice whose id already exists first reverses the effects the
//! earlier posting recorded, so re-saving an unchanged document is a no-op.
//! Amounts whose arithmetic leaves the `Decimal` range reject the document.

use crate::{
    primitives::{document_total, line_total, unwind_weighted_average, weighted_average_cost},
    types::{
        AppState, Direction, Invoice, InvoiceId, InvoiceItem, InvoiceType, ItemId, PartyId,
        PostingRecord, Product, StockLevel, StockMove, Template, Transfer, TransferId, TreasuryId,
        TreasuryTransaction,
    },
    Error, Result,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Invoice line as submitted by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    /// Keep an existing line id when editing
    pub id: Option<ItemId>,
    /// Product lookup key
    pub product_code: String,
    /// Name used when the product cannot be resolved
    pub product_name: String,
    /// Quantity
    pub qty: Decimal,
    /// Unit price
    pub price: Decimal,
}

impl ItemDraft {
    /// New line for a product code
    pub fn new(product_code: impl Into<String>, qty: Decimal, price: Decimal) -> Self {
        Self {
            id: None,
            product_code: product_code.into(),
            product_name: String::new(),
            qty,
            price,
        }
    }
}

/// Invoice as submitted by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    /// Existing invoice id when editing, `None` for a new document
    pub id: Option<InvoiceId>,
    /// Document type
    pub invoice_type: InvoiceType,
    /// Document number; blank gets `INV-<epoch millis>`
    pub number: String,
    /// Document date
    pub date: NaiveDate,
    /// Counterparty
    pub party_id: PartyId,
    /// Name used when the party cannot be resolved
    pub party_name: String,
    /// Ordered lines
    pub items: Vec<ItemDraft>,
    /// Paid at posting time
    pub paid_amount: Decimal,
    /// Notes
    pub notes: String,
    /// Print layout
    pub template: Template,
}

impl InvoiceDraft {
    /// Empty draft for a party
    pub fn new(invoice_type: InvoiceType, party_id: PartyId, date: NaiveDate) -> Self {
        Self {
            id: None,
            invoice_type,
            number: String::new(),
            date,
            party_id,
            party_name: String::new(),
            items: Vec::new(),
            paid_amount: Decimal::ZERO,
            notes: String::new(),
            template: Template::default(),
        }
    }

    /// Draft that re-posts an existing invoice with its current content
    pub fn from_invoice(invoice: &Invoice) -> Self {
        Self {
            id: Some(invoice.id.clone()),
            invoice_type: invoice.invoice_type,
            number: invoice.number.clone(),
            date: invoice.date,
            party_id: invoice.party_id.clone(),
            party_name: invoice.party_name.clone(),
            items: invoice
                .items
                .iter()
                .map(|item| ItemDraft {
                    id: Some(item.id.clone()),
                    product_code: item.product_code.clone(),
                    product_name: item.product_name.clone(),
                    qty: item.qty,
                    price: item.price,
                })
                .collect(),
            paid_amount: invoice.paid_amount,
            notes: invoice.notes.clone(),
            template: invoice.template,
        }
    }

    /// Append a line
    pub fn with_item(mut self, product_code: impl Into<String>, qty: Decimal, price: Decimal) -> Self {
        self.items.push(ItemDraft::new(product_code, qty, price));
        self
    }

    /// Set the paid amount
    pub fn with_paid(mut self, paid_amount: Decimal) -> Self {
        self.paid_amount = paid_amount;
        self
    }

    /// Set the document number
    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.party_id.is_empty() {
            return Err(Error::Validation("Party is required".to_string()));
        }
        if self.items.is_empty() {
            return Err(Error::Validation(
                "Invoice needs at least one item".to_string(),
            ));
        }
        if self.paid_amount < Decimal::ZERO {
            return Err(Error::Validation(
                "Paid amount cannot be negative".to_string(),
            ));
        }
        for item in &self.items {
            if item.qty < Decimal::ZERO {
                return Err(Error::Validation(format!(
                    "Quantity cannot be negative (product {})",
                    item.product_code
                )));
            }
            if item.price < Decimal::ZERO {
                return Err(Error::Validation(format!(
                    "Price cannot be negative (product {})",
                    item.product_code
                )));
            }
        }
        Ok(())
    }
}

/// Balance transfer request
#[derive(Debug, Clone, PartialEq)]
pub struct TransferDraft {
    /// Transfer date
    pub date: NaiveDate,
    /// Party whose balance decreases
    pub from_party_id: PartyId,
    /// Party whose balance increases
    pub to_party_id: PartyId,
    /// Amount, must be positive
    pub amount: Decimal,
    /// Reason text
    pub reason: String,
}

/// Manual cash entry request
#[derive(Debug, Clone, PartialEq)]
pub struct TreasuryDraft {
    /// Entry date
    pub date: NaiveDate,
    /// In or Out
    pub direction: Direction,
    /// Amount, must be positive
    pub amount: Decimal,
    /// Reason, required
    pub reason: String,
    /// Optional party reference
    pub party_id: Option<PartyId>,
}

/// Recoverable referential miss reported alongside a successful posting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingWarning {
    /// Line product code not found; the line moved no stock
    MissingProduct {
        /// Line ID
        line_id: ItemId,
        /// Unresolved code
        product_code: String,
    },
    /// Party not found; no balance moved
    MissingParty {
        /// Unresolved party
        party_id: PartyId,
    },
    /// Payment entry of an older invoice could not be located for reversal
    UnlinkedPayment {
        /// Invoice being reversed
        invoice_id: InvoiceId,
    },
}

impl fmt::Display for PostingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostingWarning::MissingProduct { line_id, product_code } => {
                write!(f, "line {} skipped: product {} not found", line_id, product_code)
            }
            PostingWarning::MissingParty { party_id } => {
                write!(f, "party {} not found: balance not updated", party_id)
            }
            PostingWarning::UnlinkedPayment { invoice_id } => {
                write!(f, "payment entry of invoice {} not linked: left in place", invoice_id)
            }
        }
    }
}

/// Outcome of a successful posting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingStatus {
    /// Every effect applied
    Applied,
    /// Applied, but some lines or references were skipped
    AppliedWithWarnings,
}

/// New snapshot plus the record the operation produced
#[derive(Debug, Clone)]
pub struct Posting<T> {
    /// Snapshot with all effects applied
    pub state: AppState,
    /// Created or affected record
    pub output: T,
    /// Skipped effects
    pub warnings: Vec<PostingWarning>,
}

impl<T> Posting<T> {
    pub(crate) fn new(state: AppState, output: T) -> Self {
        Self {
            state,
            output,
            warnings: Vec::new(),
        }
    }

    /// Applied or applied-with-warnings
    pub fn status(&self) -> PostingStatus {
        if self.warnings.is_empty() {
            PostingStatus::Applied
        } else {
            PostingStatus::AppliedWithWarnings
        }
    }
}

fn in_range(value: Option<Decimal>) -> Result<Decimal> {
    value.ok_or_else(|| Error::Validation("Amount out of range".to_string()))
}

/// Apply one line to a product's quantity and average cost
fn apply_line(product: &mut Product, invoice_type: InvoiceType, item: &InvoiceItem) -> Result<()> {
    if invoice_type.is_outgoing() {
        product.current_qty = in_range(product.current_qty.checked_sub(item.qty))?;
    } else {
        if invoice_type.updates_avg_cost() {
            product.avg_cost = in_range(weighted_average_cost(
                product.current_qty,
                product.avg_cost,
                item.qty,
                item.price,
            ))?;
        }
        product.current_qty = in_range(product.current_qty.checked_add(item.qty))?;
    }
    Ok(())
}

/// Undo one line without a recorded prior level
fn unwind_line(product: &mut Product, invoice_type: InvoiceType, item: &InvoiceItem) -> Result<()> {
    if invoice_type.is_outgoing() {
        product.current_qty = in_range(product.current_qty.checked_add(item.qty))?;
    } else {
        if invoice_type.updates_avg_cost() {
            product.avg_cost = in_range(unwind_weighted_average(
                product.current_qty,
                product.avg_cost,
                item.qty,
                item.price,
            ))?;
        }
        product.current_qty = in_range(product.current_qty.checked_sub(item.qty))?;
    }
    Ok(())
}

/// Post (or re-post) an invoice
pub fn post_invoice(state: &AppState, draft: InvoiceDraft) -> Result<Posting<Invoice>> {
    draft.validate()?;

    let mut next = state.clone();
    let mut warnings = Vec::new();

    let id = draft.id.clone().unwrap_or_else(InvoiceId::generate);
    if let Some(previous) = state.invoice(&id) {
        tracing::debug!(invoice_id = %id, "Reversing previous posting before re-post");
        reverse_posting(&mut next, previous, &mut warnings)?;
    }

    let number = if draft.number.trim().is_empty() {
        format!("INV-{}", Utc::now().timestamp_millis())
    } else {
        draft.number
    };

    let items = draft
        .items
        .into_iter()
        .map(|line| {
            let product_name = next
                .product_by_code(&line.product_code)
                .map(|p| p.name.clone())
                .unwrap_or(line.product_name);
            Ok(InvoiceItem {
                id: line.id.unwrap_or_else(ItemId::generate),
                total: in_range(line_total(line.qty, line.price))?,
                product_code: line.product_code,
                product_name,
                qty: line.qty,
                price: line.price,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let total = in_range(document_total(&items))?;
    let invoice_type = draft.invoice_type;

    let mut record = PostingRecord::default();

    // Stock
    for item in &items {
        match next.product_by_code_mut(&item.product_code) {
            Some(product) => {
                let before = StockLevel::of(product);
                apply_line(product, invoice_type, item)?;
                record.stock_lines.push(StockMove {
                    line_id: item.id.clone(),
                    before,
                    after: StockLevel::of(product),
                });
            }
            None => {
                tracing::warn!(
                    invoice_id = %id,
                    product_code = %item.product_code,
                    "Product not found, line moves no stock"
                );
                warnings.push(PostingWarning::MissingProduct {
                    line_id: item.id.clone(),
                    product_code: item.product_code.clone(),
                });
            }
        }
    }

    // Party balance
    let remaining = in_range(total.checked_sub(draft.paid_amount))?;
    let party_name = match next.party_mut(&draft.party_id) {
        Some(party) => {
            party.current_balance = in_range(if invoice_type.is_outgoing() {
                party.current_balance.checked_add(remaining)
            } else {
                party.current_balance.checked_sub(remaining)
            })?;
            record.party_applied = true;
            party.name.clone()
        }
        None => {
            tracing::warn!(invoice_id = %id, party_id = %draft.party_id, "Party not found");
            warnings.push(PostingWarning::MissingParty {
                party_id: draft.party_id.clone(),
            });
            draft.party_name
        }
    };

    // Cash
    if draft.paid_amount > Decimal::ZERO {
        let entry = TreasuryTransaction {
            id: TreasuryId::generate(),
            date: draft.date,
            direction: invoice_type.cash_direction(),
            amount: draft.paid_amount,
            reason: format!("Payment for {} invoice {}", invoice_type.label(), number),
            party_id: Some(draft.party_id.clone()),
            invoice_id: Some(id.clone()),
        };
        record.treasury_id = Some(entry.id.clone());
        next.treasury.push(entry);
    }

    let invoice = Invoice {
        id: id.clone(),
        invoice_type,
        number,
        date: draft.date,
        party_id: draft.party_id,
        party_name,
        items,
        total,
        paid_amount: draft.paid_amount,
        notes: draft.notes,
        template: draft.template,
        posting: Some(record),
    };

    match next.invoices.iter().position(|i| i.id == id) {
        Some(index) => next.invoices[index] = invoice.clone(),
        None => next.invoices.push(invoice.clone()),
    }

    tracing::debug!(
        invoice_id = %invoice.id,
        invoice_type = %invoice.invoice_type,
        total = %invoice.total,
        paid = %invoice.paid_amount,
        warnings = warnings.len(),
        "Invoice posted"
    );

    Ok(Posting {
        state: next,
        output: invoice,
        warnings,
    })
}

/// Reverse an invoice's effects and remove it
pub fn delete_invoice(state: &AppState, id: &InvoiceId) -> Result<Posting<Invoice>> {
    let invoice = state
        .invoice(id)
        .cloned()
        .ok_or_else(|| Error::InvoiceNotFound(id.to_string()))?;

    let mut next = state.clone();
    let mut warnings = Vec::new();
    reverse_posting(&mut next, &invoice, &mut warnings)?;
    next.invoices.retain(|i| &i.id != id);

    Ok(Posting {
        state: next,
        output: invoice,
        warnings,
    })
}

/// Undo the stock, balance and cash effects of a posted invoice
///
/// Uses the recorded `PostingRecord`. A line whose product still sits at the
/// level the posting left it at gets its earlier level back exactly; a product
/// moved by later postings is unwound by quantity and price instead. Invoices
/// restored from older backups have no record and are reversed against
/// whatever references resolve now.
fn reverse_posting(
    state: &mut AppState,
    invoice: &Invoice,
    warnings: &mut Vec<PostingWarning>,
) -> Result<()> {
    let record = invoice.posting.as_ref();
    let invoice_type = invoice.invoice_type;

    for item in invoice.items.iter().rev() {
        let moved = match record {
            Some(record) => match record.stock_lines.iter().find(|m| m.line_id == item.id) {
                Some(moved) => Some(moved),
                None => continue,
            },
            None => None,
        };
        match state.product_by_code_mut(&item.product_code) {
            Some(product) => match moved {
                Some(moved) if StockLevel::of(product) == moved.after => {
                    product.current_qty = moved.before.qty;
                    product.avg_cost = moved.before.avg_cost;
                }
                _ => unwind_line(product, invoice_type, item)?,
            },
            None => warnings.push(PostingWarning::MissingProduct {
                line_id: item.id.clone(),
                product_code: item.product_code.clone(),
            }),
        }
    }

    if record.map_or(true, |r| r.party_applied) {
        let remaining = invoice.remaining();
        match state.party_mut(&invoice.party_id) {
            Some(party) => {
                party.current_balance = in_range(if invoice_type.is_outgoing() {
                    party.current_balance.checked_sub(remaining)
                } else {
                    party.current_balance.checked_add(remaining)
                })?;
            }
            None => warnings.push(PostingWarning::MissingParty {
                party_id: invoice.party_id.clone(),
            }),
        }
    }

    match record {
        Some(record) => {
            if let Some(treasury_id) = &record.treasury_id {
                state.treasury.retain(|t| &t.id != treasury_id);
            }
        }
        None if invoice.paid_amount > Decimal::ZERO => {
            let before = state.treasury.len();
            state
                .treasury
                .retain(|t| t.invoice_id.as_ref() != Some(&invoice.id));
            if state.treasury.len() == before {
                warnings.push(PostingWarning::UnlinkedPayment {
                    invoice_id: invoice.id.clone(),
                });
            }
        }
        None => {}
    }
    Ok(())
}

/// Move balance from one party to another
pub fn transfer_balance(state: &AppState, draft: TransferDraft) -> Result<Posting<Transfer>> {
    if draft.from_party_id.is_empty() || draft.to_party_id.is_empty() {
        return Err(Error::Validation(
            "Both parties are required".to_string(),
        ));
    }
    if draft.from_party_id == draft.to_party_id {
        return Err(Error::Validation(
            "Cannot transfer to the same party".to_string(),
        ));
    }
    if draft.amount <= Decimal::ZERO {
        return Err(Error::Validation(
            "Transfer amount must be positive".to_string(),
        ));
    }
    for id in [&draft.from_party_id, &draft.to_party_id] {
        if state.party(id).is_none() {
            return Err(Error::PartyNotFound(id.to_string()));
        }
    }

    let mut next = state.clone();
    for party in next.parties.iter_mut() {
        if party.id == draft.from_party_id {
            party.current_balance = in_range(party.current_balance.checked_sub(draft.amount))?;
        } else if party.id == draft.to_party_id {
            party.current_balance = in_range(party.current_balance.checked_add(draft.amount))?;
        }
    }

    let transfer = Transfer {
        id: TransferId::generate(),
        date: draft.date,
        from_party_id: draft.from_party_id,
        to_party_id: draft.to_party_id,
        amount: draft.amount,
        reason: draft.reason,
    };
    next.transfers.push(transfer.clone());

    tracing::debug!(
        transfer_id = %transfer.id,
        from = %transfer.from_party_id,
        to = %transfer.to_party_id,
        amount = %transfer.amount,
        "Balance transferred"
    );

    Ok(Posting::new(next, transfer))
}

/// Record a manual cash movement
pub fn record_treasury(state: &AppState, draft: TreasuryDraft) -> Result<Posting<TreasuryTransaction>> {
    if draft.amount <= Decimal::ZERO {
        return Err(Error::Validation("Amount must be positive".to_string()));
    }
    if draft.reason.trim().is_empty() {
        return Err(Error::Validation("Reason is required".to_string()));
    }

    let entry = TreasuryTransaction {
        id: TreasuryId::generate(),
        date: draft.date,
        direction: draft.direction,
        amount: draft.amount,
        reason: draft.reason,
        party_id: draft.party_id.filter(|id| !id.is_empty()),
        invoice_id: None,
    };

    let mut next = state.clone();
    next.treasury.push(entry.clone());
    Ok(Posting::new(next, entry))
}

/// Remove a cash entry; an invoice linked to it forgets the link
pub fn remove_treasury(state: &AppState, id: &TreasuryId) -> Result<Posting<TreasuryTransaction>> {
    let entry = state
        .treasury
        .iter()
        .find(|t| &t.id == id)
        .cloned()
        .ok_or_else(|| Error::TreasuryNotFound(id.to_string()))?;

    let mut next = state.clone();
    next.treasury.retain(|t| &t.id != id);
    if let Some(invoice_id) = &entry.invoice_id {
        if let Some(invoice) = next.invoices.iter_mut().find(|i| &i.id == invoice_id) {
            if let Some(record) = invoice.posting.as_mut() {
                record.treasury_id = None;
            }
        }
    }

    Ok(Posting::new(next, entry))
}
