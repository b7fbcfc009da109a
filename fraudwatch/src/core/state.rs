use crate::{core::ordering::order_transactions, domain::prelude::*};

/// In-memory view state of the fraud queue.
///
/// Holds the suspicious transactions fetched from the backend together with
/// the search term typed by the analyst. The collection is only ever
/// replaced wholesale or patched one record at a time.
///
#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    /// The fraud-only transactions currently displayed.
    pub transactions: Vec<Transaction>,

    /// Free-text filter over id, user id and city.
    pub search: String,
}

impl ConsoleState {
    /// Replaces the queue with the fraud subset of `all`.
    pub fn load(&mut self, all: Vec<Transaction>) {
        self.transactions = all.into_iter().filter(|t| t.status.is_fraud()).collect();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Transactions matching the current search term.
    pub fn visible(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| self.search.is_empty() || t.matches(&self.search))
            .collect()
    }

    /// Visible transactions in (user, timestamp) order.
    pub fn visible_sorted(&self) -> Vec<Transaction> {
        let visible: Vec<Transaction> = self.visible().into_iter().cloned().collect();
        order_transactions(&visible)
    }

    /// Number of fraud records nobody has been alerted about yet.
    pub fn new_fraud_count(&self) -> usize {
        self.transactions.iter().filter(|t| !t.notification_sent).count()
    }

    /// Marks one transaction as notified. Returns false when it is unknown.
    pub fn mark_notified(&mut self, id: &str) -> bool {
        match self.transactions.iter_mut().find(|t| t.id == id) {
            Some(transaction) => {
                transaction.notification_sent = true;
                true
            }
            None => false,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }
}
