use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const INCOME_CATEGORIES: &[&str] = &[
    "Sales",
    "Services",
    "Investment",
    "Consulting",
    "Other Income",
];

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Rent",
    "Utilities",
    "Salaries",
    "Marketing",
    "Supplies",
    "Travel",
    "Software",
    "Equipment",
    "Other Expense",
];

pub const PAYMENT_METHODS: &[&str] = &["cash", "credit_card", "bank_transfer", "check", "paypal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    #[must_use]
    pub fn categories(self) -> &'static [&'static str] {
        match self {
            TransactionKind::Income => INCOME_CATEGORIES,
            TransactionKind::Expense => EXPENSE_CATEGORIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    /// Decimal string as entered; see [`parse_amount`].
    pub amount: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payment_method: String,
}

impl Transaction {
    #[must_use]
    pub fn amount_value(&self) -> f64 {
        parse_amount(&self.amount)
    }
}

/// Transaction fields before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub amount: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payment_method: String,
}

impl TransactionDraft {
    pub(crate) fn into_transaction(self, id: u64) -> Transaction {
        Transaction {
            id,
            date: self.date,
            kind: self.kind,
            category: self.category,
            amount: self.amount,
            description: self.description,
            payment_method: self.payment_method,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: u64,
    pub category: String,
    pub amount: String,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetDraft {
    pub category: String,
    pub amount: String,
    pub period: BudgetPeriod,
}

impl BudgetDraft {
    pub(crate) fn into_budget(self, id: u64) -> Budget {
        Budget {
            id,
            category: self.category,
            amount: self.amount,
            period: self.period,
        }
    }
}

/// Budget with spending over all expense transactions of its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetWithComparison {
    #[serde(flatten)]
    pub budget: Budget,
    pub spent: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    #[serde(default)]
    pub description: String,
    pub quantity: f64,
    pub rate: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    #[default]
    Unpaid,
    Overdue,
}

impl InvoiceStatus {
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, InvoiceStatus::Unpaid | InvoiceStatus::Overdue)
    }

    /// Paid flips to unpaid; unpaid and overdue flip to paid.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            InvoiceStatus::Paid => InvoiceStatus::Unpaid,
            InvoiceStatus::Unpaid | InvoiceStatus::Overdue => InvoiceStatus::Paid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: u64,
    pub invoice_number: String,
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
    pub date: NaiveDate,
    /// Free text; may be empty.
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub notes: String,
    pub total: f64,
    pub status: InvoiceStatus,
}

/// Invoice fields before id, total and status are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    /// Generated when empty.
    #[serde(default)]
    pub invoice_number: String,
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub category_breakdown: std::collections::BTreeMap<String, f64>,
}

/// Parse the leading decimal number of `raw`, like JavaScript's
/// `parseFloat`. Empty or non-numeric input yields 0.
#[must_use]
pub fn parse_amount(raw: &str) -> f64 {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    text[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
