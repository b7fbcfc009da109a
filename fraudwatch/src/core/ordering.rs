use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::warn;

use crate::domain::prelude::*;

/// Whether a transaction carries the fields needed to be ordered.
///
/// Both `user_id` and `timestamp` must be present and non-empty.
///
pub fn is_orderable(transaction: &Transaction) -> bool {
    let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
    present(&transaction.user_id) && present(&transaction.timestamp)
}

/// Sort key of an orderable transaction, parsed once up front.
struct SortKey<'a> {
    user_id: &'a str,
    instant: Option<DateTime<Utc>>,
    raw_timestamp: &'a str,
}

impl<'a> SortKey<'a> {
    fn of(transaction: &'a Transaction) -> Self {
        Self {
            user_id: transaction.user_id(),
            instant: transaction.instant(),
            raw_timestamp: transaction.timestamp(),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.user_id
            .cmp(other.user_id)
            .then_with(|| match (self.instant, other.instant) {
                (Some(a), Some(b)) => a.cmp(&b),
                // unparseable timestamps go last within a user
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => self.raw_timestamp.cmp(other.raw_timestamp),
            })
    }
}

/// Orders transactions by user id, then by timestamp (oldest first).
///
/// Records failing [`is_orderable`] are dropped and only counted in the
/// log. The input is left untouched; a new vector is returned. The sort is
/// stable, so records with identical keys keep their relative input order.
///
pub fn order_transactions(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut keyed: Vec<(SortKey<'_>, &Transaction)> = transactions
        .iter()
        .filter(|t| is_orderable(t))
        .map(|t| (SortKey::of(t), t))
        .collect();

    let dropped = transactions.len() - keyed.len();
    if dropped > 0 {
        warn!(dropped, "filtered out invalid transactions during sort");
    }

    keyed.sort_by(|(a, _), (b, _)| a.compare(b));
    keyed.into_iter().map(|(_, t)| t.clone()).collect()
}
