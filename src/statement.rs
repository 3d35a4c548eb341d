// src/statement.rs
//
// Management account (simplified P&L) built from invoice data.

use crate::models::{Invoice, ManagementAccountEntry};

/// Headline figures of the statement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatementTotals {
    pub revenue: f64,
    pub cost_of_goods: f64,
    pub operating_expenses: f64,
}

impl StatementTotals {
    /// Revenue is the sum of invoice amounts. Costs stay at zero until
    /// supplier invoices are wired in.
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        Self {
            revenue: invoices.iter().filter_map(Invoice::amount).sum(),
            cost_of_goods: 0.0,
            operating_expenses: 0.0,
        }
    }

    pub fn gross_margin(&self) -> f64 {
        self.revenue - self.cost_of_goods
    }

    pub fn net_result(&self) -> f64 {
        self.gross_margin() - self.operating_expenses
    }

    /// Statement lines in display order.
    pub fn entries(&self) -> Vec<ManagementAccountEntry> {
        let lines = [
            ("revenue", "CHIFFRE D'AFFAIRES", self.revenue),
            ("on_site_sales", "Ventes sur place", self.revenue),
            ("cost_of_goods", "COÛT DES MARCHANDISES", self.cost_of_goods),
            ("gross_margin", "MARGE BRUTE", self.gross_margin()),
            ("operating_expenses", "CHARGES D'EXPLOITATION", self.operating_expenses),
            ("net_result", "RÉSULTAT NET", self.net_result()),
        ];

        lines
            .into_iter()
            .map(|(id, category, amount)| ManagementAccountEntry {
                id: id.to_string(),
                category: category.to_string(),
                amount,
                percentage: self.share_of_revenue(id, amount),
            })
            .collect()
    }

    // Revenue line is always 100%; with no revenue everything else is 0%.
    fn share_of_revenue(&self, id: &str, amount: f64) -> f64 {
        if id == "revenue" {
            100.0
        } else if self.revenue == 0.0 {
            0.0
        } else {
            amount / self.revenue * 100.0
        }
    }
}

pub fn build_statement(invoices: &[Invoice]) -> Vec<ManagementAccountEntry> {
    StatementTotals::from_invoices(invoices).entries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_statement() {
        let entries = build_statement(&[]);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].category, "CHIFFRE D'AFFAIRES");
        assert_eq!(entries[0].percentage, 100.0);
        assert!(entries[1..].iter().all(|e| e.amount == 0.0 && e.percentage == 0.0));
    }

    #[test]
    fn test_revenue_from_invoice_amounts() {
        let invoices = vec![
            Invoice(json!({ "id": 1, "amount": 100.0 })),
            Invoice(json!({ "id": 2, "amount": "50.5" })),
            Invoice(json!({ "id": 3, "amount": null })),
            Invoice(json!({ "id": 4 })),
        ];
        let entries = build_statement(&invoices);

        assert_eq!(entries[0].amount, 150.5);
        assert_eq!(entries[1].amount, 150.5);
        assert_eq!(entries[1].percentage, 100.0);
        assert_eq!(entries[3].id, "gross_margin");
        assert_eq!(entries[3].amount, 150.5);
        assert_eq!(entries[5].category, "RÉSULTAT NET");
        assert_eq!(entries[5].percentage, 100.0);
    }

    #[test]
    fn test_margin_with_costs() {
        let totals = StatementTotals {
            revenue: 1000.0,
            cost_of_goods: 300.0,
            operating_expenses: 200.0,
        };
        let entries = totals.entries();
        assert_eq!(entries[3].amount, 700.0);
        assert_eq!(entries[3].percentage, 70.0);
        assert_eq!(entries[5].amount, 500.0);
        assert_eq!(entries[5].percentage, 50.0);
    }
}
