//! Read-only reports over a snapshot
//!
//! Nothing here mutates state; every function folds over the borrowed
//! [`AppState`] and can run alongside any number of other readers.

use crate::types::{
    AppState, Direction, Invoice, InvoiceType, PartyId, Product, TreasuryTransaction,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reporting period
///
/// Filtering applies only when both bounds are set; an open bound includes
/// everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// First day, inclusive
    pub from: Option<NaiveDate>,
    /// Last day, inclusive
    pub to: Option<NaiveDate>,
}

impl Period {
    /// Closed range
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether `date` falls in the period
    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => date >= from && date <= to,
            _ => true,
        }
    }
}

/// Profit and loss over a period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitReport {
    pub sales: Decimal,
    pub sale_returns: Decimal,
    pub purchases: Decimal,
    pub purchase_returns: Decimal,
    /// sales - sale returns
    pub net_sales: Decimal,
    /// purchases - purchase returns
    pub net_purchases: Decimal,
    /// net sales - net purchases
    pub gross_profit: Decimal,
    /// All cash out
    pub operating_expenses: Decimal,
    /// Cash in not tied to a party
    pub other_income: Decimal,
    /// gross profit - operating expenses + other income
    pub net_profit: Decimal,
}

/// Compute the profit report for a period
pub fn summarize(state: &AppState, period: Period) -> ProfitReport {
    let invoices_of = |kind: InvoiceType| -> Decimal {
        state
            .invoices
            .iter()
            .filter(|i| i.invoice_type == kind && period.contains(i.date))
            .map(|i| i.total)
            .sum()
    };

    let sales = invoices_of(InvoiceType::Sale);
    let sale_returns = invoices_of(InvoiceType::SaleReturn);
    let purchases = invoices_of(InvoiceType::Purchase);
    let purchase_returns = invoices_of(InvoiceType::PurchaseReturn);

    let in_period = state.treasury.iter().filter(|t| period.contains(t.date));
    let operating_expenses: Decimal = in_period
        .clone()
        .filter(|t| t.direction == Direction::Out)
        .map(|t| t.amount)
        .sum();
    let other_income: Decimal = in_period
        .filter(|t| t.direction == Direction::In && t.party_id.is_none())
        .map(|t| t.amount)
        .sum();

    let net_sales = sales - sale_returns;
    let net_purchases = purchases - purchase_returns;
    let gross_profit = net_sales - net_purchases;

    ProfitReport {
        sales,
        sale_returns,
        purchases,
        purchase_returns,
        net_sales,
        net_purchases,
        gross_profit,
        operating_expenses,
        other_income,
        net_profit: gross_profit - operating_expenses + other_income,
    }
}

/// Cash on hand: all In minus all Out
pub fn cash_position(state: &AppState) -> Decimal {
    state
        .treasury
        .iter()
        .map(|t| match t.direction {
            Direction::In => t.amount,
            Direction::Out => -t.amount,
        })
        .sum()
}

/// Treasury history filter; each bound applies on its own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreasuryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring of the reason
    pub search: Option<String>,
}

/// Matching cash entries, newest first
pub fn treasury_history<'a>(
    state: &'a AppState,
    filter: &TreasuryFilter,
) -> Vec<&'a TreasuryTransaction> {
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut entries: Vec<_> = state
        .treasury
        .iter()
        .filter(|t| filter.from.map_or(true, |from| t.date >= from))
        .filter(|t| filter.to.map_or(true, |to| t.date <= to))
        .filter(|t| {
            needle
                .as_ref()
                .map_or(true, |n| t.reason.to_lowercase().contains(n))
        })
        .collect();

    // Stable sort keeps insertion order within a day
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

/// One party's invoices, newest first
pub fn party_statement<'a>(state: &'a AppState, party_id: &PartyId) -> Vec<&'a Invoice> {
    let mut invoices: Vec<_> = state
        .invoices
        .iter()
        .filter(|i| &i.party_id == party_id)
        .collect();
    invoices.sort_by(|a, b| b.date.cmp(&a.date));
    invoices
}

/// Invoices of one type whose number or party name contains `term`
pub fn search_invoices<'a>(
    state: &'a AppState,
    invoice_type: InvoiceType,
    term: &str,
) -> Vec<&'a Invoice> {
    let term = term.trim().to_lowercase();
    state
        .invoices
        .iter()
        .filter(|i| i.invoice_type == invoice_type)
        .filter(|i| {
            term.is_empty()
                || i.number.to_lowercase().contains(&term)
                || i.party_name.to_lowercase().contains(&term)
        })
        .collect()
}

/// Stock on hand with its value at average cost
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub code: String,
    pub name: String,
    pub qty: Decimal,
    pub avg_cost: Decimal,
    pub value: Decimal,
}

impl From<&Product> for StockLine {
    fn from(product: &Product) -> Self {
        Self {
            code: product.code.clone(),
            name: product.name.clone(),
            qty: product.current_qty,
            avg_cost: product.avg_cost,
            value: product.stock_value(),
        }
    }
}

/// Inventory valuation, one line per product
pub fn stock_report(state: &AppState) -> Vec<StockLine> {
    state.products.iter().map(StockLine::from).collect()
}

/// Headline numbers for the landing screen
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// All-time sales
    pub total_sales: Decimal,
    /// All-time purchases
    pub total_purchases: Decimal,
    /// Customers, including parties that are both
    pub customers: usize,
    /// Products below the threshold
    pub low_stock: usize,
    pub cash_position: Decimal,
}

impl DashboardStats {
    /// Compute from a snapshot
    pub fn compute(state: &AppState, low_stock_threshold: i64) -> Self {
        let threshold = Decimal::from(low_stock_threshold);
        let total_of = |kind: InvoiceType| -> Decimal {
            state
                .invoices
                .iter()
                .filter(|i| i.invoice_type == kind)
                .map(|i| i.total)
                .sum()
        };

        Self {
            total_sales: total_of(InvoiceType::Sale),
            total_purchases: total_of(InvoiceType::Purchase),
            customers: state.parties.iter().filter(|p| p.is_customer()).count(),
            low_stock: state
                .products
                .iter()
                .filter(|p| p.current_qty < threshold)
                .count(),
            cash_position: cash_position(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvoiceId, Party, PartyKind, ProductId, Template, TreasuryId};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn invoice(kind: InvoiceType, day: u32, total: i64) -> Invoice {
        Invoice {
            id: InvoiceId::generate(),
            invoice_type: kind,
            number: format!("N-{}", day),
            date: date(day),
            party_id: PartyId::new("p1"),
            party_name: "Ali Trading".to_string(),
            items: vec![],
            total: Decimal::from(total),
            paid_amount: Decimal::ZERO,
            notes: String::new(),
            template: Template::Classic,
            posting: None,
        }
    }

    fn cash(direction: Direction, day: u32, amount: i64, party: Option<&str>, reason: &str) -> TreasuryTransaction {
        TreasuryTransaction {
            id: TreasuryId::generate(),
            date: date(day),
            direction,
            amount: Decimal::from(amount),
            reason: reason.to_string(),
            party_id: party.map(PartyId::new),
            invoice_id: None,
        }
    }

    fn sample() -> AppState {
        AppState {
            invoices: vec![
                invoice(InvoiceType::Sale, 1, 300),
                invoice(InvoiceType::SaleReturn, 2, 50),
                invoice(InvoiceType::Purchase, 3, 120),
                invoice(InvoiceType::PurchaseReturn, 4, 20),
                invoice(InvoiceType::Sale, 20, 1000),
            ],
            treasury: vec![
                cash(Direction::Out, 5, 40, None, "Rent"),
                cash(Direction::In, 6, 25, None, "Scrap sale"),
                cash(Direction::In, 7, 300, Some("p1"), "Payment for sale invoice N-1"),
            ],
            ..AppState::default()
        }
    }

    #[test]
    fn test_summarize_period() {
        let report = summarize(&sample(), Period::between(date(1), date(10)));
        assert_eq!(report.net_sales, Decimal::from(250));
        assert_eq!(report.net_purchases, Decimal::from(100));
        assert_eq!(report.gross_profit, Decimal::from(150));
        assert_eq!(report.operating_expenses, Decimal::from(40));
        // Party-linked receipts are already in net sales
        assert_eq!(report.other_income, Decimal::from(25));
        assert_eq!(report.net_profit, Decimal::from(135));
    }

    #[test]
    fn test_half_open_period_includes_everything() {
        let open = Period {
            from: Some(date(15)),
            to: None,
        };
        assert_eq!(summarize(&sample(), open), summarize(&sample(), Period::all()));
        assert_eq!(summarize(&sample(), open).sales, Decimal::from(1300));
    }

    #[test]
    fn test_inclusive_bounds() {
        let report = summarize(&sample(), Period::between(date(20), date(20)));
        assert_eq!(report.sales, Decimal::from(1000));
        assert_eq!(report.purchases, Decimal::ZERO);
    }

    #[test]
    fn test_cash_position() {
        assert_eq!(cash_position(&sample()), Decimal::from(285));
    }

    #[test]
    fn test_treasury_history_filters_and_orders() {
        let state = sample();
        let all = treasury_history(&state, &TreasuryFilter::default());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, date(7));

        let from_only = TreasuryFilter {
            from: Some(date(6)),
            ..TreasuryFilter::default()
        };
        assert_eq!(treasury_history(&state, &from_only).len(), 2);

        let search = TreasuryFilter {
            search: Some("RENT".to_string()),
            ..TreasuryFilter::default()
        };
        let found = treasury_history(&state, &search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reason, "Rent");
    }

    #[test]
    fn test_party_statement_newest_first() {
        let mut state = sample();
        state.invoices[1].party_id = PartyId::new("p2");
        let statement = party_statement(&state, &PartyId::new("p1"));
        assert_eq!(statement.len(), 4);
        assert_eq!(statement[0].date, date(20));
    }

    #[test]
    fn test_search_invoices() {
        let state = sample();
        assert_eq!(search_invoices(&state, InvoiceType::Sale, "").len(), 2);
        assert_eq!(search_invoices(&state, InvoiceType::Sale, "n-20").len(), 1);
        assert_eq!(search_invoices(&state, InvoiceType::Sale, "ali").len(), 2);
        assert!(search_invoices(&state, InvoiceType::Purchase, "zzz").is_empty());
    }

    #[test]
    fn test_dashboard_stats() {
        let mut state = sample();
        for kind in [PartyKind::Customer, PartyKind::Supplier, PartyKind::Both] {
            state.parties.push(Party {
                id: PartyId::generate(),
                code: String::new(),
                name: format!("{:?}", kind),
                kind,
                category: String::new(),
                phone: String::new(),
                opening_balance: Decimal::ZERO,
                current_balance: Decimal::ZERO,
            });
        }
        for (code, qty) in [("A", 4), ("B", 5), ("C", 0)] {
            state.products.push(Product {
                id: ProductId::generate(),
                code: code.to_string(),
                name: code.to_string(),
                opening_qty: Decimal::ZERO,
                opening_value: Decimal::ZERO,
                current_qty: Decimal::from(qty),
                avg_cost: Decimal::ONE,
            });
        }

        let stats = DashboardStats::compute(&state, 5);
        assert_eq!(stats.total_sales, Decimal::from(1300));
        assert_eq!(stats.total_purchases, Decimal::from(120));
        assert_eq!(stats.customers, 2);
        assert_eq!(stats.low_stock, 2);

        let stock = stock_report(&state);
        assert_eq!(stock[0].value, Decimal::from(4));
    }
}
