//! Receita por linha e agregados de vendas.

use async_trait::async_trait;
use crate::error::Result;
use crate::traits::Transformer;
use crate::types::{RevenueRecord, Transaction};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::info;

/// Número de notas fiscais distintas de um país
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountrySales {
    pub country: String,
    pub number_of_sales: usize,
}

/// Receita acumulada de uma descrição de item
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionRevenue {
    pub description: String,
    pub total_revenue: f64,
}

/// Agregados calculados sobre o dataset limpo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesReport {
    pub total_revenue: f64,
    /// Ordenado por país
    pub sales_by_country: Vec<CountrySales>,
    /// Ordenado por receita, da maior para a menor
    pub revenue_by_description: Vec<DescriptionRevenue>,
}

impl SalesReport {
    fn from_rows(rows: &[RevenueRecord]) -> Self {
        let total_revenue = rows.iter().fold(0.0, |acc, r| acc + r.total_revenue);

        let mut invoices: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for row in rows {
            let t = &row.transaction;
            if let Some(country) = t.country.as_deref() {
                let entry = invoices.entry(country).or_default();
                if let Some(invoice) = t.invoice_no.as_deref() {
                    entry.insert(invoice);
                }
            }
        }
        let sales_by_country = invoices
            .into_iter()
            .map(|(country, invoices)| CountrySales {
                country: country.to_string(),
                number_of_sales: invoices.len(),
            })
            .collect();

        let mut by_description: HashMap<&str, f64> = HashMap::new();
        for row in rows {
            *by_description
                .entry(row.transaction.description.as_str())
                .or_default() += row.total_revenue;
        }
        let mut revenue_by_description: Vec<DescriptionRevenue> = by_description
            .into_iter()
            .map(|(description, total_revenue)| DescriptionRevenue {
                description: description.to_string(),
                total_revenue,
            })
            .collect();
        revenue_by_description.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then_with(|| a.description.cmp(&b.description))
        });

        Self {
            total_revenue,
            sales_by_country,
            revenue_by_description,
        }
    }
}

impl fmt::Display for SalesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Revenue: ${:.2}", self.total_revenue)?;

        writeln!(f)?;
        writeln!(f, "Sales by Country:")?;
        for sales in &self.sales_by_country {
            writeln!(f, "  {:<24} {}", sales.country, sales.number_of_sales)?;
        }

        writeln!(f)?;
        writeln!(f, "Sales by Category:")?;
        for item in &self.revenue_by_description {
            writeln!(f, "  {:<40} {:.2}", item.description, item.total_revenue)?;
        }
        Ok(())
    }
}

/// Linhas com receita, prontas para o warehouse, e os agregados
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedDataset {
    pub rows: Vec<RevenueRecord>,
    pub report: SalesReport,
}

/// Calcula `TotalRevenue` por linha e os agregados de vendas
#[derive(Debug, Clone, Default)]
pub struct RevenueTransform;

impl RevenueTransform {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, rows: Vec<Transaction>) -> TransformedDataset {
        let rows: Vec<RevenueRecord> = rows
            .into_iter()
            .map(|transaction| RevenueRecord {
                total_revenue: transaction.revenue(),
                transaction,
            })
            .collect();
        let report = SalesReport::from_rows(&rows);

        info!(
            rows = rows.len(),
            total_revenue = report.total_revenue,
            "Transformação concluída:\n{}",
            report
        );

        TransformedDataset { rows, report }
    }
}

#[async_trait]
impl Transformer for RevenueTransform {
    type Input = Transaction;
    type Output = TransformedDataset;

    async fn transform(&self, data: Vec<Transaction>) -> Result<TransformedDataset> {
        Ok(self.apply(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(invoice: &str, description: &str, quantity: i64, price: f64, country: Option<&str>) -> Transaction {
        Transaction {
            invoice_no: Some(invoice.to_string()),
            stock_code: None,
            description: description.to_string(),
            quantity,
            invoice_date: None,
            unit_price: price,
            customer_id: "17850".to_string(),
            country: country.map(str::to_string),
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            transaction("1", "Caneca", 2, 1.5, Some("United Kingdom")),
            transaction("1", "Prato", 1, 10.0, Some("United Kingdom")),
            transaction("2", "Caneca", 4, 1.5, Some("United Kingdom")),
            transaction("3", "Copo", 3, 2.0, Some("France")),
            transaction("4", "Copo", 1, 4.0, None),
        ]
    }

    #[test]
    fn test_revenue_per_row() {
        let result = RevenueTransform::new().apply(sample());

        assert_eq!(result.rows.len(), 5);
        for row in &result.rows {
            assert_eq!(
                row.total_revenue,
                row.transaction.quantity as f64 * row.transaction.unit_price
            );
        }
    }

    #[test]
    fn test_total_revenue_is_sum_of_rows() {
        let result = RevenueTransform::new().apply(sample());
        let expected: f64 = result.rows.iter().map(|r| r.total_revenue).sum();

        assert_eq!(result.report.total_revenue, expected);
        assert_eq!(result.report.total_revenue, 3.0 + 10.0 + 6.0 + 6.0 + 4.0);
    }

    #[test]
    fn test_sales_by_country_counts_distinct_invoices() {
        let report = RevenueTransform::new().apply(sample()).report;

        assert_eq!(
            report.sales_by_country,
            vec![
                CountrySales { country: "France".to_string(), number_of_sales: 1 },
                CountrySales { country: "United Kingdom".to_string(), number_of_sales: 2 },
            ]
        );
    }

    #[test]
    fn test_revenue_by_description_sorted_descending() {
        let report = RevenueTransform::new().apply(sample()).report;
        let order: Vec<_> = report
            .revenue_by_description
            .iter()
            .map(|d| (d.description.as_str(), d.total_revenue))
            .collect();

        assert_eq!(order, vec![("Copo", 10.0), ("Prato", 10.0), ("Caneca", 9.0)]);
    }

    #[test]
    fn test_empty_dataset() {
        let result = RevenueTransform::new().apply(Vec::new());
        assert!(result.rows.is_empty());
        assert_eq!(result.report, SalesReport::default());
        assert!(result.report.total_revenue.is_sign_positive());
        assert!(result.report.to_string().contains("Total Revenue: $0.00"));
    }

    #[tokio::test]
    async fn test_revenue_as_transformer() {
        let result = RevenueTransform::new().transform(sample()).await.unwrap();
        assert_eq!(result.report.revenue_by_description.len(), 3);
    }
}
