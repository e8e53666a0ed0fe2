//! Core types for the bookkeeping snapshot
//!
//! All types are designed for:
//! - Verbatim JSON persistence (camelCase field names, `type` discriminators)
//! - Exact arithmetic (Decimal for money and quantities)
//! - Tolerance of dangling references (names are denormalized at posting time)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing id
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random id
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Get as string
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True for the blank id a form submits when nothing was selected
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Customer/supplier identifier
    PartyId
);
string_id!(
    /// Inventory item identifier
    ProductId
);
string_id!(
    /// Invoice identifier
    InvoiceId
);
string_id!(
    /// Invoice line identifier
    ItemId
);
string_id!(
    /// Cash-ledger entry identifier
    TreasuryId
);
string_id!(
    /// Balance transfer identifier
    TransferId
);
string_id!(
    /// User identifier
    UserId
);

/// Which side of the business a party usually sits on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyKind {
    /// Buys from the business
    #[default]
    Customer,
    /// Sells to the business
    Supplier,
    /// Both directions
    Both,
}

/// Customer or supplier with a single running balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    /// Party ID
    pub id: PartyId,
    /// Human-facing code
    pub code: String,
    /// Display name
    pub name: String,
    /// Customer / Supplier / Both
    #[serde(rename = "type")]
    pub kind: PartyKind,
    /// Free-form category (see `AppState::categories`)
    #[serde(default)]
    pub category: String,
    /// Phone number
    #[serde(default)]
    pub phone: String,
    /// Balance at creation time
    pub opening_balance: Decimal,
    /// Running balance, mutated only by postings and transfers
    pub current_balance: Decimal,
}

impl Party {
    /// Counts towards the customer total on the dashboard
    pub fn is_customer(&self) -> bool {
        matches!(self.kind, PartyKind::Customer | PartyKind::Both)
    }
}

/// Inventory item with weighted-average costing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID
    pub id: ProductId,
    /// Lookup key used by invoice lines
    pub code: String,
    /// Display name
    pub name: String,
    /// Quantity at creation time
    pub opening_qty: Decimal,
    /// Stock value at creation time
    pub opening_value: Decimal,
    /// On-hand quantity; negative means oversold
    pub current_qty: Decimal,
    /// Weighted-average unit cost
    pub avg_cost: Decimal,
}

impl Product {
    /// Stock valued at average cost
    pub fn stock_value(&self) -> Decimal {
        self.current_qty * self.avg_cost
    }
}

/// Invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    /// Line ID
    pub id: ItemId,
    /// Product code at posting time
    pub product_code: String,
    /// Product name at posting time
    pub product_name: String,
    /// Quantity
    pub qty: Decimal,
    /// Unit price
    pub price: Decimal,
    /// qty × price
    pub total: Decimal,
}

/// Invoice document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceType {
    /// Sale to a customer
    Sale,
    /// Purchase from a supplier
    Purchase,
    /// Goods returned by a customer
    SaleReturn,
    /// Goods returned to a supplier
    PurchaseReturn,
}

impl InvoiceType {
    /// All document types
    pub const ALL: [InvoiceType; 4] = [
        InvoiceType::Sale,
        InvoiceType::Purchase,
        InvoiceType::SaleReturn,
        InvoiceType::PurchaseReturn,
    ];

    /// Stock leaves the warehouse and the party balance grows
    pub fn is_outgoing(&self) -> bool {
        matches!(self, InvoiceType::Sale | InvoiceType::PurchaseReturn)
    }

    /// Direction of the cash-ledger entry created for a payment
    pub fn cash_direction(&self) -> Direction {
        if self.is_outgoing() {
            Direction::In
        } else {
            Direction::Out
        }
    }

    /// Only purchases move the average cost
    pub fn updates_avg_cost(&self) -> bool {
        matches!(self, InvoiceType::Purchase)
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceType::Sale => "sale",
            InvoiceType::Purchase => "purchase",
            InvoiceType::SaleReturn => "sale return",
            InvoiceType::PurchaseReturn => "purchase return",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Print layout, presentation only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Template {
    /// Default layout
    #[default]
    Classic,
    /// Minimal layout
    Minimal,
    /// Modern layout
    Modern,
}

/// Quantity and average cost of a product at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    /// Quantity on hand
    pub qty: Decimal,
    /// Unit average cost
    pub avg_cost: Decimal,
}

impl StockLevel {
    /// Current level of a product
    pub fn of(product: &Product) -> Self {
        Self {
            qty: product.current_qty,
            avg_cost: product.avg_cost,
        }
    }
}

/// Stock movement of one invoice line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMove {
    /// Line that moved stock
    pub line_id: ItemId,
    /// Product level just before the line applied
    pub before: StockLevel,
    /// Product level just after it
    pub after: StockLevel,
}

/// Effects a posting actually applied, kept so it can be reversed exactly
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingRecord {
    /// Lines whose product was found, in posting order
    #[serde(default)]
    pub stock_lines: Vec<StockMove>,
    /// Whether the party balance moved
    #[serde(default)]
    pub party_applied: bool,
    /// Cash entry created for the paid amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treasury_id: Option<TreasuryId>,
}

/// Sale, purchase or return document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Invoice ID
    pub id: InvoiceId,
    /// Document type
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    /// Document number
    pub number: String,
    /// Document date
    pub date: NaiveDate,
    /// Counterparty reference (may dangle after deletion)
    pub party_id: PartyId,
    /// Counterparty name at posting time
    #[serde(default)]
    pub party_name: String,
    /// Ordered lines
    pub items: Vec<InvoiceItem>,
    /// Sum of line totals
    pub total: Decimal,
    /// Paid at posting time
    #[serde(default)]
    pub paid_amount: Decimal,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
    /// Print layout
    #[serde(default)]
    pub template: Template,
    /// Applied effects; absent on documents restored from older backups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting: Option<PostingRecord>,
}

impl Invoice {
    /// Unpaid part of the document
    pub fn remaining(&self) -> Decimal {
        self.total - self.paid_amount
    }

    /// Total quantity over all lines
    pub fn total_qty(&self) -> Decimal {
        self.items.iter().map(|item| item.qty).sum()
    }
}

/// Cash movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Cash received
    In,
    /// Cash paid out
    Out,
}

/// Cash-ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryTransaction {
    /// Entry ID
    pub id: TreasuryId,
    /// Entry date
    pub date: NaiveDate,
    /// In or Out
    #[serde(rename = "type")]
    pub direction: Direction,
    /// Amount, never negative
    pub amount: Decimal,
    /// Reason text
    #[serde(default)]
    pub reason: String,
    /// Related party, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
    /// Invoice whose payment created this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceId>,
}

/// Balance moved from one party to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Transfer ID
    pub id: TransferId,
    /// Transfer date
    pub date: NaiveDate,
    /// Debited party
    pub from_party_id: PartyId,
    /// Credited party
    pub to_party_id: PartyId,
    /// Amount, strictly positive
    pub amount: Decimal,
    /// Reason text
    #[serde(default)]
    pub reason: String,
}

/// Company letterhead data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    /// Company name
    pub name: String,
    /// Phone
    #[serde(default)]
    pub phone: String,
    /// WhatsApp number
    #[serde(default)]
    pub whatsapp: String,
    /// Postal address
    #[serde(default)]
    pub address: String,
    /// Commercial register number
    #[serde(default)]
    pub commercial_register: String,
    /// Tax card number
    #[serde(default)]
    pub tax_card: String,
    /// Logo as a data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full access
    Admin,
    /// Day-to-day bookkeeping
    Accountant,
}

impl Role {
    /// Permission list granted to new users of this role
    pub fn default_permissions(&self) -> Vec<String> {
        let perms: &[&str] = match self {
            Role::Admin => &[
                "dashboard",
                "sales",
                "purchases",
                "inventory",
                "statements",
                "treasury",
                "reports",
                "settings",
                "import",
            ],
            Role::Accountant => &["dashboard", "sales", "statements", "treasury"],
        };
        perms.iter().map(|p| p.to_string()).collect()
    }
}

/// Application user
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Plaintext password from older snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Argon2 PHC string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Role
    pub role: Role,
    /// Screens the user may open
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl User {
    /// Check a permission
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Still carries a plaintext password
    pub fn has_legacy_password(&self) -> bool {
        self.password_hash.is_none() && self.password.is_some()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

/// The full snapshot: single source of truth for the application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Users
    #[serde(default)]
    pub users: Vec<User>,
    /// Customers and suppliers
    #[serde(default)]
    pub parties: Vec<Party>,
    /// Inventory
    #[serde(default)]
    pub products: Vec<Product>,
    /// Posted documents
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    /// Cash ledger
    #[serde(default)]
    pub treasury: Vec<TreasuryTransaction>,
    /// Balance transfers
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    /// Company letterhead
    #[serde(default)]
    pub company_info: CompanyInfo,
    /// Party categories
    #[serde(default)]
    pub categories: Vec<String>,
}

impl AppState {
    /// Find party by ID
    pub fn party(&self, id: &PartyId) -> Option<&Party> {
        self.parties.iter().find(|p| &p.id == id)
    }

    /// Find party by ID (mutable)
    pub fn party_mut(&mut self, id: &PartyId) -> Option<&mut Party> {
        self.parties.iter_mut().find(|p| &p.id == id)
    }

    /// Find product by code, first match wins
    pub fn product_by_code(&self, code: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.code == code)
    }

    /// Find product by code (mutable)
    pub fn product_by_code_mut(&mut self, code: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.code == code)
    }

    /// Find invoice by ID
    pub fn invoice(&self, id: &InvoiceId) -> Option<&Invoice> {
        self.invoices.iter().find(|i| &i.id == id)
    }

    /// Find user by name
    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Sum of all party balances
    pub fn total_party_balance(&self) -> Decimal {
        self.parties.iter().map(|p| p.current_balance).sum()
    }
}
