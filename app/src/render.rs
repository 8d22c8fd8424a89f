//! Plain-text views of the dashboard, the transaction list and the session.

use pocketbook_core::dashboard::summarize;
use pocketbook_core::format::{format_currency, format_date};
use pocketbook_core::ledger::LoadStatus;
use pocketbook_core::{
    Category, DashboardView, SessionPhase, SessionState, Transaction, TransactionLedger,
    TransactionType,
};
use std::fmt::Write;

pub fn session(state: &SessionState) -> String {
    match (state.phase(), &state.identity) {
        (SessionPhase::Authenticated, Some(identity)) => {
            let mut out = format!("Signed in as {}", identity.label());
            if let Some(email) = &identity.email {
                if Some(email.as_str()) != identity.display_name.as_deref() {
                    let _ = write!(out, " <{email}>");
                }
            }
            let _ = write!(out, " (uid {})", identity.uid);
            out
        }
        (SessionPhase::Errored, _) => format!(
            "Sign-in failed: {}",
            state.error.as_deref().unwrap_or("unknown error")
        ),
        (SessionPhase::Authenticating, _) => "Signing in...".to_string(),
        _ => "Not signed in".to_string(),
    }
}

pub fn dashboard(view: &DashboardView) -> String {
    let summary = &view.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Dashboard for {}", view.period);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  Balance   {}{}",
        format_currency(summary.balance),
        if view.balance_is_positive() { "" } else { "  (negative)" }
    );
    let _ = writeln!(out, "  Incomes   {}", format_currency(summary.total_incomes));
    let _ = writeln!(out, "  Expenses  {}", format_currency(summary.total_expenses));

    let _ = writeln!(out);
    let _ = writeln!(out, "Expenses by category");
    let slices = view.expense_slices();
    if slices.is_empty() {
        let _ = writeln!(out, "  No expenses this month");
    }
    for slice in &slices {
        let _ = writeln!(out, "  {:<32} {}", slice.label(), format_currency(slice.amount));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "History");
    if !view.has_history() {
        let _ = writeln!(out, "  No history available");
    }
    for item in &view.history {
        let _ = writeln!(
            out,
            "  {:<10} in {:>14}  out {:>14}",
            item.name,
            format_currency(item.income),
            format_currency(item.expense)
        );
    }
    out.trim_end().to_string()
}

pub fn ledger(ledger: &TransactionLedger) -> String {
    let mut out = String::new();
    let _ = write!(out, "Transactions for {}", ledger.period());
    if !ledger.search_text().trim().is_empty() {
        let _ = write!(out, " matching \"{}\"", ledger.search_text().trim());
    }
    let _ = writeln!(out);

    match ledger.status() {
        LoadStatus::Failed(message) => {
            let _ = write!(out, "  {message}");
            return out;
        }
        LoadStatus::Idle | LoadStatus::Loading => {
            let _ = write!(out, "  Loading...");
            return out;
        }
        LoadStatus::Loaded => {}
    }

    if ledger.visible().is_empty() {
        let _ = write!(out, "  No transactions found");
        return out;
    }
    for transaction in ledger.visible() {
        let _ = writeln!(out, "  {}", transaction_row(transaction));
    }
    let totals = summarize(ledger.visible());
    let _ = writeln!(
        out,
        "  Incomes {}  Expenses {}  Balance {}",
        format_currency(totals.total_incomes),
        format_currency(totals.total_expenses),
        format_currency(totals.balance)
    );
    out.trim_end().to_string()
}

pub fn transaction_row(transaction: &Transaction) -> String {
    let amount = match transaction.kind {
        TransactionType::Expense => format_currency(-transaction.amount),
        TransactionType::Income => format_currency(transaction.amount),
    };
    let category = transaction
        .category
        .as_ref()
        .map(|category| category.name.as_str())
        .unwrap_or(&transaction.category_id);
    format!(
        "{}  {:<28} {:<16} {:>14}  [{}]",
        format_date(&transaction.date),
        transaction.description.as_deref().unwrap_or("-"),
        category,
        amount,
        transaction.id
    )
}

pub fn categories(categories: &[&Category]) -> String {
    if categories.is_empty() {
        return "No categories".to_string();
    }
    categories
        .iter()
        .map(|category| {
            format!(
                "{:<20} {:<8} {:<8} {}",
                category.id, category.kind, category.color, category.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
