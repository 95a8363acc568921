use chrono::{Datelike, NaiveDate};

use super::model::{
    Budget, BudgetWithComparison, FinancialMetrics, Invoice, InvoiceItem, Transaction,
    TransactionKind,
};

/// Totals for one calendar month.
#[must_use]
pub fn monthly_metrics(transactions: &[Transaction], year: i32, month: u32) -> FinancialMetrics {
    let mut metrics = FinancialMetrics::default();
    for tx in transactions
        .iter()
        .filter(|tx| tx.date.year() == year && tx.date.month() == month)
    {
        let amount = tx.amount_value();
        match tx.kind {
            TransactionKind::Income => metrics.total_income += amount,
            TransactionKind::Expense => metrics.total_expenses += amount,
        }
        *metrics
            .category_breakdown
            .entry(tx.category.clone())
            .or_insert(0.0) += amount;
    }
    metrics.net_profit = metrics.total_income - metrics.total_expenses;
    metrics
}

/// Categories with a positive total, largest first.
#[must_use]
pub fn category_ranking(metrics: &FinancialMetrics) -> Vec<(&str, f64)> {
    let mut rows: Vec<(&str, f64)> = metrics
        .category_breakdown
        .iter()
        .filter(|(_, amount)| **amount > 0.0)
        .map(|(category, amount)| (category.as_str(), *amount))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    rows
}

/// Spending against each budget. The period is not applied: every expense
/// of the budget's category counts.
#[must_use]
pub fn budget_comparison(
    budgets: &[Budget],
    transactions: &[Transaction],
) -> Vec<BudgetWithComparison> {
    budgets
        .iter()
        .map(|budget| {
            let spent: f64 = transactions
                .iter()
                .filter(|tx| tx.kind == TransactionKind::Expense && tx.category == budget.category)
                .map(Transaction::amount_value)
                .sum();
            let limit = super::model::parse_amount(&budget.amount);
            let percentage = if limit > 0.0 {
                spent / limit * 100.0
            } else {
                0.0
            };
            BudgetWithComparison {
                budget: budget.clone(),
                spent,
                percentage,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PendingInvoices {
    pub count: usize,
    pub amount: f64,
}

/// Unpaid and overdue invoices.
#[must_use]
pub fn pending_invoices(invoices: &[Invoice]) -> PendingInvoices {
    invoices
        .iter()
        .filter(|invoice| invoice.status.is_pending())
        .fold(PendingInvoices::default(), |acc, invoice| PendingInvoices {
            count: acc.count + 1,
            amount: acc.amount + invoice.total,
        })
}

#[must_use]
pub fn invoice_total(items: &[InvoiceItem]) -> f64 {
    items
        .iter()
        .map(|item| item.quantity * super::model::parse_amount(&item.rate))
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    All,
    /// At most seven days before `today`.
    Week,
    /// Same calendar month as `today`.
    Month,
}

impl std::str::FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DateRange::All),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            other => Err(format!(
                "unknown date range '{other}'. Must be one of: all, week, month"
            )),
        }
    }
}

impl DateRange {
    fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            DateRange::All => true,
            DateRange::Week => (today - date).num_days() <= 7,
            DateRange::Month => date.year() == today.year() && date.month() == today.month(),
        }
    }
}

/// Transactions matching a description/category search, an optional exact
/// category and a date range, newest first.
#[must_use]
pub fn filter_transactions(
    transactions: &[Transaction],
    search: &str,
    category: Option<&str>,
    range: DateRange,
    today: NaiveDate,
) -> Vec<Transaction> {
    let needle = search.to_lowercase();
    let mut matched: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| {
            tx.description.to_lowercase().contains(&needle)
                || tx.category.to_lowercase().contains(&needle)
        })
        .filter(|tx| category.map_or(true, |category| tx.category == category))
        .filter(|tx| range.contains(tx.date, today))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.date.cmp(&a.date));
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::model::{BudgetPeriod, InvoiceStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: u64, day: NaiveDate, kind: TransactionKind, category: &str, amount: &str) -> Transaction {
        Transaction {
            id,
            date: day,
            kind,
            category: category.to_string(),
            amount: amount.to_string(),
            description: format!("{category} #{id}"),
            payment_method: "cash".to_string(),
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(1, date(2024, 3, 2), TransactionKind::Income, "Sales", "1000"),
            tx(2, date(2024, 3, 10), TransactionKind::Expense, "Rent", "400.50"),
            tx(3, date(2024, 3, 12), TransactionKind::Expense, "Travel", "99.50"),
            tx(4, date(2024, 2, 27), TransactionKind::Expense, "Rent", "400"),
            tx(5, date(2023, 3, 15), TransactionKind::Income, "Sales", "50"),
            tx(6, date(2024, 3, 20), TransactionKind::Expense, "Supplies", ""),
        ]
    }

    #[test]
    fn test_monthly_metrics() {
        let metrics = monthly_metrics(&sample(), 2024, 3);
        assert_eq!(metrics.total_income, 1000.0);
        assert_eq!(metrics.total_expenses, 500.0);
        assert_eq!(metrics.net_profit, 500.0);
        assert_eq!(metrics.category_breakdown["Rent"], 400.5);
        assert_eq!(metrics.category_breakdown["Supplies"], 0.0);
        assert_eq!(metrics.category_breakdown["Sales"], 1000.0);
        assert!(!metrics.category_breakdown.contains_key("Salaries"));
    }

    #[test]
    fn test_category_ranking_sorted_and_positive() {
        let metrics = monthly_metrics(&sample(), 2024, 3);
        let rows = category_ranking(&metrics);
        let names: Vec<&str> = rows.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["Sales", "Rent", "Travel"]);
    }

    #[test]
    fn test_budget_comparison_counts_all_periods() {
        let budgets = vec![
            Budget {
                id: 1,
                category: "Rent".into(),
                amount: "1000".into(),
                period: BudgetPeriod::Monthly,
            },
            Budget {
                id: 2,
                category: "Travel".into(),
                amount: "0".into(),
                period: BudgetPeriod::Yearly,
            },
        ];
        let rows = budget_comparison(&budgets, &sample());
        assert_eq!(rows[0].spent, 800.5);
        assert!((rows[0].percentage - 80.05).abs() < 1e-9);
        assert_eq!(rows[1].spent, 99.5);
        assert_eq!(rows[1].percentage, 0.0);
    }

    #[test]
    fn test_pending_invoices_and_total() {
        let items = vec![
            InvoiceItem {
                description: "Design".into(),
                quantity: 2.0,
                rate: "150".into(),
            },
            InvoiceItem {
                description: "Hosting".into(),
                quantity: 1.0,
                rate: "".into(),
            },
        ];
        assert_eq!(invoice_total(&items), 300.0);

        let invoice = |id, status, total| Invoice {
            id,
            invoice_number: format!("INV-{id}"),
            client_name: "Acme".into(),
            client_email: String::new(),
            date: date(2024, 3, 1),
            due_date: String::new(),
            items: Vec::new(),
            notes: String::new(),
            total,
            status,
        };
        let pending = pending_invoices(&[
            invoice(1, InvoiceStatus::Paid, 100.0),
            invoice(2, InvoiceStatus::Unpaid, 200.0),
            invoice(3, InvoiceStatus::Overdue, 50.0),
        ]);
        assert_eq!(pending.count, 2);
        assert_eq!(pending.amount, 250.0);
    }

    #[test]
    fn test_filter_transactions() {
        let today = date(2024, 3, 15);
        let all = filter_transactions(&sample(), "", None, DateRange::All, today);
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].id, 6);
        assert_eq!(all.last().unwrap().id, 5);

        let rent = filter_transactions(&sample(), "RENT", None, DateRange::All, today);
        assert_eq!(rent.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2, 4]);

        let week = filter_transactions(&sample(), "", None, DateRange::Week, today);
        assert_eq!(week.iter().map(|t| t.id).collect::<Vec<_>>(), vec![6, 3, 2]);

        let month = filter_transactions(&sample(), "", Some("Sales"), DateRange::Month, today);
        assert_eq!(month.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_date_range_parse() {
        assert_eq!("week".parse::<DateRange>().unwrap(), DateRange::Week);
        assert!("year".parse::<DateRange>().is_err());
    }
}
