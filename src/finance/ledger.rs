use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use super::metrics::{
    budget_comparison, invoice_total, monthly_metrics, pending_invoices, PendingInvoices,
};
use super::model::{
    Budget, BudgetDraft, BudgetWithComparison, FinancialMetrics, Invoice, InvoiceDraft,
    InvoiceStatus, Transaction, TransactionDraft,
};
use crate::error::StoreError;
use crate::storage::{load_json, save_json, KvStore};
use crate::util::next_timestamp_id;

pub const TRANSACTIONS_KEY: &str = "finance_transactions";
pub const BUDGETS_KEY: &str = "finance_budgets";
pub const INVOICES_KEY: &str = "finance_invoices";

/// Snapshot written by [`FinanceLedger::export`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceExport {
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
    pub invoices: Vec<Invoice>,
    pub exported_at: String,
}

#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("financial-data-{}.json", date.format("%Y-%m-%d"))
}

/// Dashboard figures for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceSummary {
    pub month: FinancialMetrics,
    pub budgets: Vec<BudgetWithComparison>,
    pub pending: PendingInvoices,
}

#[derive(Debug, Default)]
struct Collections {
    transactions: Vec<Transaction>,
    budgets: Vec<Budget>,
    invoices: Vec<Invoice>,
}

/// Transactions, budgets and invoices, each persisted under its own key on
/// every change.
pub struct FinanceLedger<S> {
    store: S,
    collections: RwLock<Collections>,
}

fn not_found(kind: &str, id: u64) -> StoreError {
    StoreError::NotFound(format!("{kind} {id}"))
}

impl<S: KvStore> FinanceLedger<S> {
    pub fn open(store: S) -> Self {
        let collections = Collections {
            transactions: load_json(&store, TRANSACTIONS_KEY, Vec::new()),
            budgets: load_json(&store, BUDGETS_KEY, Vec::new()),
            invoices: load_json(&store, INVOICES_KEY, Vec::new()),
        };
        tracing::debug!(
            transactions = collections.transactions.len(),
            budgets = collections.budgets.len(),
            invoices = collections.invoices.len(),
            "loaded finance data"
        );
        Self {
            store,
            collections: RwLock::new(collections),
        }
    }

    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.collections.read().transactions.clone()
    }

    #[must_use]
    pub fn budgets(&self) -> Vec<Budget> {
        self.collections.read().budgets.clone()
    }

    #[must_use]
    pub fn invoices(&self) -> Vec<Invoice> {
        self.collections.read().invoices.clone()
    }

    pub fn add_transaction(&self, draft: TransactionDraft) -> Transaction {
        let transaction = draft.into_transaction(next_timestamp_id());
        let mut collections = self.collections.write();
        collections.transactions.push(transaction.clone());
        save_json(&self.store, TRANSACTIONS_KEY, &collections.transactions);
        transaction
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn update_transaction(
        &self,
        id: u64,
        draft: TransactionDraft,
    ) -> Result<Transaction, StoreError> {
        let mut collections = self.collections.write();
        let slot = collections
            .transactions
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or_else(|| not_found("transaction", id))?;
        *slot = draft.into_transaction(id);
        let updated = slot.clone();
        save_json(&self.store, TRANSACTIONS_KEY, &collections.transactions);
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn delete_transaction(&self, id: u64) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        let before = collections.transactions.len();
        collections.transactions.retain(|tx| tx.id != id);
        if collections.transactions.len() == before {
            return Err(not_found("transaction", id));
        }
        save_json(&self.store, TRANSACTIONS_KEY, &collections.transactions);
        Ok(())
    }

    pub fn add_budget(&self, draft: BudgetDraft) -> Budget {
        let budget = draft.into_budget(next_timestamp_id());
        let mut collections = self.collections.write();
        collections.budgets.push(budget.clone());
        save_json(&self.store, BUDGETS_KEY, &collections.budgets);
        budget
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn update_budget(&self, id: u64, draft: BudgetDraft) -> Result<Budget, StoreError> {
        let mut collections = self.collections.write();
        let slot = collections
            .budgets
            .iter_mut()
            .find(|budget| budget.id == id)
            .ok_or_else(|| not_found("budget", id))?;
        *slot = draft.into_budget(id);
        let updated = slot.clone();
        save_json(&self.store, BUDGETS_KEY, &collections.budgets);
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn delete_budget(&self, id: u64) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        let before = collections.budgets.len();
        collections.budgets.retain(|budget| budget.id != id);
        if collections.budgets.len() == before {
            return Err(not_found("budget", id));
        }
        save_json(&self.store, BUDGETS_KEY, &collections.budgets);
        Ok(())
    }

    /// Add an invoice. It starts unpaid; the total is computed from items and
    /// an empty invoice number is generated.
    pub fn add_invoice(&self, draft: InvoiceDraft) -> Invoice {
        let id = next_timestamp_id();
        let invoice = build_invoice(id, draft, InvoiceStatus::Unpaid);
        let mut collections = self.collections.write();
        collections.invoices.push(invoice.clone());
        save_json(&self.store, INVOICES_KEY, &collections.invoices);
        invoice
    }

    /// Replace an invoice's fields, keeping its status and recomputing the
    /// total.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn update_invoice(&self, id: u64, draft: InvoiceDraft) -> Result<Invoice, StoreError> {
        let mut collections = self.collections.write();
        let slot = collections
            .invoices
            .iter_mut()
            .find(|invoice| invoice.id == id)
            .ok_or_else(|| not_found("invoice", id))?;
        *slot = build_invoice(id, draft, slot.status);
        let updated = slot.clone();
        save_json(&self.store, INVOICES_KEY, &collections.invoices);
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn delete_invoice(&self, id: u64) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        let before = collections.invoices.len();
        collections.invoices.retain(|invoice| invoice.id != id);
        if collections.invoices.len() == before {
            return Err(not_found("invoice", id));
        }
        save_json(&self.store, INVOICES_KEY, &collections.invoices);
        Ok(())
    }

    /// Flip paid and unpaid. Overdue invoices become paid.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn toggle_invoice_status(&self, id: u64) -> Result<Invoice, StoreError> {
        let mut collections = self.collections.write();
        let invoice = collections
            .invoices
            .iter_mut()
            .find(|invoice| invoice.id == id)
            .ok_or_else(|| not_found("invoice", id))?;
        invoice.status = invoice.status.toggled();
        let updated = invoice.clone();
        save_json(&self.store, INVOICES_KEY, &collections.invoices);
        Ok(updated)
    }

    /// Month metrics for `today`, budget comparison, and pending invoices.
    #[must_use]
    pub fn summary(&self, today: NaiveDate) -> FinanceSummary {
        use chrono::Datelike;

        let collections = self.collections.read();
        FinanceSummary {
            month: monthly_metrics(&collections.transactions, today.year(), today.month()),
            budgets: budget_comparison(&collections.budgets, &collections.transactions),
            pending: pending_invoices(&collections.invoices),
        }
    }

    #[must_use]
    pub fn export(&self, now: DateTime<Utc>) -> FinanceExport {
        let collections = self.collections.read();
        FinanceExport {
            transactions: collections.transactions.clone(),
            budgets: collections.budgets.clone(),
            invoices: collections.invoices.clone(),
            exported_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

fn build_invoice(id: u64, draft: InvoiceDraft, status: InvoiceStatus) -> Invoice {
    let invoice_number = if draft.invoice_number.trim().is_empty() {
        default_invoice_number(id)
    } else {
        draft.invoice_number
    };
    Invoice {
        id,
        total: invoice_total(&draft.items),
        invoice_number,
        client_name: draft.client_name,
        client_email: draft.client_email,
        date: draft.date,
        due_date: draft.due_date,
        items: draft.items,
        notes: draft.notes,
        status,
    }
}

/// `INV-` followed by the last six digits of the id.
fn default_invoice_number(id: u64) -> String {
    format!("INV-{:06}", id % 1_000_000)
}
