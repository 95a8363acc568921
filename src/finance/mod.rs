pub mod ledger;
pub mod metrics;
pub mod model;

pub use ledger::{export_file_name, FinanceExport, FinanceLedger, FinanceSummary};
pub use metrics::{DateRange, PendingInvoices};
pub use model::{
    parse_amount, Budget, BudgetDraft, BudgetPeriod, BudgetWithComparison, FinancialMetrics,
    Invoice, InvoiceDraft, InvoiceItem, InvoiceStatus, Transaction, TransactionDraft,
    TransactionKind,
};
