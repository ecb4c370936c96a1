//! Stock rules for import receipts and sales.
//!
//! These functions never touch the database. Callers load the current stock
//! of every referenced book (under a row lock) and hand it in as a map; the
//! returned lines are merged per book and safe to apply.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Smallest total quantity a single import receipt may carry.
pub const MIN_IMPORT_TOTAL: i64 = 150;

/// Upper bound on `quantity_in_stock` that an import may reach.
pub const MAX_STOCK: i64 = 300;

/// One `(book_id, quantity)` pair of an import receipt or an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockLine {
    pub book_id: Uuid,
    pub quantity: i32,
}

/// What the rules need to know about a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSnapshot {
    pub title: String,
    pub quantity_in_stock: i32,
    pub price: i64,
    /// Inactive books can still be restocked but not sold.
    pub active: bool,
}

pub type StockMap = HashMap<Uuid, StockSnapshot>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockRuleError {
    #[error("At least one line is required")]
    EmptyBatch,

    #[error("Quantity for book {book_id} must be positive")]
    NonPositiveQuantity { book_id: Uuid },

    #[error("Minimum import quantity must be {minimum}")]
    BelowMinimumTotal { minimum: i64 },

    #[error("Book with id {book_id} not found")]
    BookNotFound { book_id: Uuid },

    #[error("Cannot import book '{title}' - current quantity ({current}) is already {max} or more")]
    AlreadyFull { title: String, current: i32, max: i64 },

    #[error(
        "Cannot import {quantity} units of '{title}' - would exceed {max} limit (current: {current})"
    )]
    WouldExceed {
        title: String,
        quantity: i64,
        current: i32,
        max: i64,
    },

    #[error("Book '{title}' is not available for sale")]
    NotForSale { title: String },

    #[error("Not enough stock for '{title}' (requested: {requested}, available: {available})")]
    InsufficientStock {
        title: String,
        requested: i64,
        available: i32,
    },
}

/// Sum of all line quantities, widened so hostile input cannot overflow.
pub fn total_quantity(lines: &[StockLine]) -> i64 {
    lines.iter().map(|l| i64::from(l.quantity)).sum()
}

/// Collapse lines naming the same book, keeping first-seen order.
fn merge_lines(lines: &[StockLine]) -> Vec<(Uuid, i64)> {
    let mut merged: Vec<(Uuid, i64)> = Vec::with_capacity(lines.len());
    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(lines.len());
    for line in lines {
        match index.get(&line.book_id) {
            Some(&i) => merged[i].1 += i64::from(line.quantity),
            None => {
                index.insert(line.book_id, merged.len());
                merged.push((line.book_id, i64::from(line.quantity)));
            }
        }
    }
    merged
}

fn check_shape(lines: &[StockLine]) -> Result<(), StockRuleError> {
    if lines.is_empty() {
        return Err(StockRuleError::EmptyBatch);
    }
    if let Some(line) = lines.iter().find(|l| l.quantity <= 0) {
        return Err(StockRuleError::NonPositiveQuantity {
            book_id: line.book_id,
        });
    }
    Ok(())
}

/// Validate an import receipt against current stock.
///
/// The whole batch is rejected on the first violation:
/// the receipt total must reach [`MIN_IMPORT_TOTAL`], every book must exist,
/// no book may already hold [`MAX_STOCK`] or more, and no book may end above
/// [`MAX_STOCK`] once the import is applied.
pub fn validate_import(
    lines: &[StockLine],
    stock: &StockMap,
) -> Result<Vec<StockLine>, StockRuleError> {
    check_shape(lines)?;

    if total_quantity(lines) < MIN_IMPORT_TOTAL {
        return Err(StockRuleError::BelowMinimumTotal {
            minimum: MIN_IMPORT_TOTAL,
        });
    }

    let mut accepted = Vec::new();
    for (book_id, quantity) in merge_lines(lines) {
        let book = stock
            .get(&book_id)
            .ok_or(StockRuleError::BookNotFound { book_id })?;
        let current = book.quantity_in_stock;

        if i64::from(current) >= MAX_STOCK {
            return Err(StockRuleError::AlreadyFull {
                title: book.title.clone(),
                current,
                max: MAX_STOCK,
            });
        }

        if i64::from(current) + quantity > MAX_STOCK {
            return Err(StockRuleError::WouldExceed {
                title: book.title.clone(),
                quantity,
                current,
                max: MAX_STOCK,
            });
        }

        // quantity <= MAX_STOCK here, so it fits back into i32
        accepted.push(StockLine {
            book_id,
            quantity: quantity as i32,
        });
    }

    Ok(accepted)
}

/// Validate an order against current stock; stock never goes negative and
/// inactive books are refused.
pub fn validate_sale(
    lines: &[StockLine],
    stock: &StockMap,
) -> Result<Vec<StockLine>, StockRuleError> {
    check_shape(lines)?;

    let mut accepted = Vec::new();
    for (book_id, requested) in merge_lines(lines) {
        let book = stock
            .get(&book_id)
            .ok_or(StockRuleError::BookNotFound { book_id })?;

        if !book.active {
            return Err(StockRuleError::NotForSale {
                title: book.title.clone(),
            });
        }

        if requested > i64::from(book.quantity_in_stock) {
            return Err(StockRuleError::InsufficientStock {
                title: book.title.clone(),
                requested,
                available: book.quantity_in_stock,
            });
        }

        accepted.push(StockLine {
            book_id,
            quantity: requested as i32,
        });
    }

    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, quantity_in_stock: i32) -> StockSnapshot {
        StockSnapshot {
            title: title.to_string(),
            quantity_in_stock,
            price: 10_000,
            active: true,
        }
    }

    fn line(book_id: Uuid, quantity: i32) -> StockLine {
        StockLine { book_id, quantity }
    }

    fn shelf(entries: &[(Uuid, &str, i32)]) -> StockMap {
        entries
            .iter()
            .map(|(id, title, qty)| (*id, book(title, *qty)))
            .collect()
    }

    #[test]
    fn import_below_minimum_total_is_rejected() {
        let a = Uuid::new_v4();
        let stock = shelf(&[(a, "Nha Gia Kim", 50)]);

        let err = validate_import(&[line(a, 149)], &stock).unwrap_err();
        assert_eq!(err, StockRuleError::BelowMinimumTotal { minimum: 150 });
        assert_eq!(err.to_string(), "Minimum import quantity must be 150");
    }

    #[test]
    fn import_of_exactly_minimum_total_is_accepted() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stock = shelf(&[(a, "Dac Nhan Tam", 100), (b, "Doraemon", 0)]);

        let accepted = validate_import(&[line(a, 50), line(b, 100)], &stock).unwrap();
        assert_eq!(accepted, vec![line(a, 50), line(b, 100)]);
    }

    #[test]
    fn minimum_is_checked_before_book_existence() {
        let missing = Uuid::new_v4();
        let err = validate_import(&[line(missing, 10)], &StockMap::new()).unwrap_err();
        assert!(matches!(err, StockRuleError::BelowMinimumTotal { .. }));
    }

    #[test]
    fn unknown_book_rejects_the_batch() {
        let a = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let stock = shelf(&[(a, "Think and Grow Rich", 75)]);

        let err = validate_import(&[line(a, 100), line(missing, 60)], &stock).unwrap_err();
        assert_eq!(err, StockRuleError::BookNotFound { book_id: missing });
        assert_eq!(err.to_string(), format!("Book with id {missing} not found"));
    }

    #[test]
    fn book_already_at_cap_rejects_the_batch() {
        let a = Uuid::new_v4();
        let full = Uuid::new_v4();
        let stock = shelf(&[(a, "Doraemon", 0), (full, "Nha Gia Kim", 300)]);

        let err = validate_import(&[line(a, 150), line(full, 1)], &stock).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot import book 'Nha Gia Kim' - current quantity (300) is already 300 or more"
        );
    }

    #[test]
    fn import_that_would_pass_the_cap_is_rejected() {
        let a = Uuid::new_v4();
        let stock = shelf(&[(a, "Doraemon", 150)]);

        let err = validate_import(&[line(a, 151)], &stock).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot import 151 units of 'Doraemon' - would exceed 300 limit (current: 150)"
        );
    }

    #[test]
    fn import_reaching_the_cap_exactly_is_accepted() {
        let a = Uuid::new_v4();
        let stock = shelf(&[(a, "Doraemon", 150)]);

        assert!(validate_import(&[line(a, 150)], &stock).is_ok());
    }

    #[test]
    fn split_lines_for_one_book_are_merged_before_the_cap() {
        let a = Uuid::new_v4();
        let stock = shelf(&[(a, "Doraemon", 100)]);

        let err = validate_import(&[line(a, 120), line(a, 90)], &stock).unwrap_err();
        assert!(matches!(err, StockRuleError::WouldExceed { quantity: 210, .. }));

        let accepted = validate_import(&[line(a, 100), line(a, 100)], &stock).unwrap();
        assert_eq!(accepted, vec![line(a, 200)]);
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stock = shelf(&[(a, "A", 0), (b, "B", 0)]);

        let err = validate_import(&[line(a, 200), line(b, -50)], &stock).unwrap_err();
        assert_eq!(err, StockRuleError::NonPositiveQuantity { book_id: b });
    }

    #[test]
    fn empty_batches_are_rejected() {
        assert_eq!(
            validate_import(&[], &StockMap::new()).unwrap_err(),
            StockRuleError::EmptyBatch
        );
        assert_eq!(
            validate_sale(&[], &StockMap::new()).unwrap_err(),
            StockRuleError::EmptyBatch
        );
    }

    #[test]
    fn huge_quantities_do_not_overflow_the_total() {
        let a = Uuid::new_v4();
        let stock = shelf(&[(a, "A", 0)]);

        let err = validate_import(&[line(a, i32::MAX), line(a, i32::MAX)], &stock).unwrap_err();
        assert!(matches!(err, StockRuleError::WouldExceed { .. }));
    }

    #[test]
    fn sale_within_stock_is_accepted() {
        let a = Uuid::new_v4();
        let stock = shelf(&[(a, "A", 5)]);

        let accepted = validate_sale(&[line(a, 2), line(a, 3)], &stock).unwrap();
        assert_eq!(accepted, vec![line(a, 5)]);
    }

    #[test]
    fn sale_beyond_stock_is_rejected() {
        let a = Uuid::new_v4();
        let stock = shelf(&[(a, "A", 5)]);

        let err = validate_sale(&[line(a, 4), line(a, 2)], &stock).unwrap_err();
        assert_eq!(
            err,
            StockRuleError::InsufficientStock {
                title: "A".into(),
                requested: 6,
                available: 5,
            }
        );
    }

    #[test]
    fn sale_of_unknown_book_is_rejected() {
        let missing = Uuid::new_v4();
        let err = validate_sale(&[line(missing, 1)], &StockMap::new()).unwrap_err();
        assert_eq!(err, StockRuleError::BookNotFound { book_id: missing });
    }

    #[test]
    fn inactive_book_cannot_be_sold() {
        let a = Uuid::new_v4();
        let mut stock = shelf(&[(a, "Doraemon", 50)]);
        stock.get_mut(&a).unwrap().active = false;

        let err = validate_sale(&[line(a, 1)], &stock).unwrap_err();
        assert_eq!(err.to_string(), "Book 'Doraemon' is not available for sale");
    }

    #[test]
    fn inactive_book_can_still_be_restocked() {
        let a = Uuid::new_v4();
        let mut stock = shelf(&[(a, "Doraemon", 50)]);
        stock.get_mut(&a).unwrap().active = false;

        assert!(validate_import(&[line(a, 150)], &stock).is_ok());
    }
}
