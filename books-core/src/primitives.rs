//! Ledger primitives: line totals, document totals, weighted-average cost
//!
//! Pure functions over `Decimal`. Negative inputs are not rejected here; the
//! posting layer validates its drafts before calling in. Every function
//! returns `None` when an intermediate result leaves the `Decimal` range.

use crate::types::InvoiceItem;
use rust_decimal::Decimal;

/// `qty × price`
pub fn line_total(qty: Decimal, price: Decimal) -> Option<Decimal> {
    qty.checked_mul(price)
}

/// Sum of line totals, recomputed from qty and price of every line
pub fn document_total<'a, I>(items: I) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a InvoiceItem>,
{
    items.into_iter().try_fold(Decimal::ZERO, |sum, item| {
        sum.checked_add(line_total(item.qty, item.price)?)
    })
}

/// Weighted-average unit cost after receiving `incoming_qty` at `incoming_price`
///
/// Falls back to `incoming_price` when the combined quantity is zero, which
/// covers the first receipt into an empty product.
pub fn weighted_average_cost(
    old_qty: Decimal,
    old_avg_cost: Decimal,
    incoming_qty: Decimal,
    incoming_price: Decimal,
) -> Option<Decimal> {
    let value = old_qty
        .checked_mul(old_avg_cost)?
        .checked_add(incoming_qty.checked_mul(incoming_price)?)?;
    let qty = old_qty.checked_add(incoming_qty)?;
    if qty.is_zero() {
        return Some(incoming_price);
    }
    value.checked_div(qty)
}

/// Inverse of [`weighted_average_cost`]: the average before a receipt
///
/// `current_qty`/`current_avg` describe the product after the receipt. When
/// removing the receipt leaves no stock the current average is kept, since the
/// previous one cannot be recovered. The result carries the rounding of the
/// forward division; callers holding the exact prior average should use it.
pub fn unwind_weighted_average(
    current_qty: Decimal,
    current_avg: Decimal,
    incoming_qty: Decimal,
    incoming_price: Decimal,
) -> Option<Decimal> {
    let prior_qty = current_qty.checked_sub(incoming_qty)?;
    let prior_value = current_qty
        .checked_mul(current_avg)?
        .checked_sub(incoming_qty.checked_mul(incoming_price)?)?;
    if prior_qty.is_zero() {
        return Some(current_avg);
    }
    prior_value.checked_div(prior_qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    fn item(qty: i64, price: i64) -> InvoiceItem {
        InvoiceItem {
            id: ItemId::generate(),
            product_code: "P1".to_string(),
            product_name: "Pen".to_string(),
            qty: Decimal::from(qty),
            price: Decimal::from(price),
            total: Decimal::ZERO,
        }
    }

    fn big() -> Decimal {
        Decimal::from_i128_with_scale(10i128.pow(20), 0)
    }

    #[test]
    fn test_line_total() {
        assert_eq!(
            line_total(Decimal::new(25, 1), Decimal::from(4)),
            Some(Decimal::from(10))
        );
    }

    #[test]
    fn test_line_total_out_of_range() {
        assert_eq!(line_total(big(), big()), None);
    }

    #[test]
    fn test_document_total_ignores_stale_line_totals() {
        let items = vec![item(2, 5), item(3, 7)];
        assert_eq!(document_total(&items), Some(Decimal::from(31)));
        assert_eq!(document_total(&Vec::<InvoiceItem>::new()), Some(Decimal::ZERO));
    }

    #[test]
    fn test_document_total_sum_out_of_range() {
        let mut a = item(1, 1);
        a.qty = Decimal::MAX;
        let b = item(1, 1);
        assert_eq!(document_total(&[a, b]), None);
    }

    #[test]
    fn test_weighted_average_first_receipt_uses_price() {
        let avg = weighted_average_cost(Decimal::ZERO, Decimal::ZERO, Decimal::from(10), Decimal::from(5));
        assert_eq!(avg, Some(Decimal::from(5)));
    }

    #[test]
    fn test_weighted_average_blends() {
        let avg = weighted_average_cost(Decimal::from(10), Decimal::from(5), Decimal::from(10), Decimal::from(7));
        assert_eq!(avg, Some(Decimal::from(6)));
    }

    #[test]
    fn test_weighted_average_zero_denominator_falls_back() {
        // -10 on hand, receive 10: combined quantity is zero
        let avg = weighted_average_cost(Decimal::from(-10), Decimal::from(3), Decimal::from(10), Decimal::from(8));
        assert_eq!(avg, Some(Decimal::from(8)));
    }

    #[test]
    fn test_weighted_average_out_of_range() {
        assert_eq!(weighted_average_cost(Decimal::ONE, Decimal::ONE, big(), big()), None);
    }

    #[test]
    fn test_unwind_restores_prior_average() {
        let avg = weighted_average_cost(Decimal::from(10), Decimal::from(5), Decimal::from(10), Decimal::from(7))
            .unwrap();
        let prior = unwind_weighted_average(Decimal::from(20), avg, Decimal::from(10), Decimal::from(7));
        assert_eq!(prior, Some(Decimal::from(5)));
    }

    #[test]
    fn test_unwind_to_empty_keeps_current() {
        let prior = unwind_weighted_average(Decimal::from(10), Decimal::from(5), Decimal::from(10), Decimal::from(5));
        assert_eq!(prior, Some(Decimal::from(5)));
    }
}
