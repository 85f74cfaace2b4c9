//! # Cleaner
//!
//! Limpeza do dataset bruto. Os passos são aplicados nesta ordem, e cada um
//! só enxerga as linhas que sobreviveram aos anteriores:
//!
//! 1. descarta linhas sem `CustomerID` ou sem `Description`;
//! 2. preenche descrições ausentes com [`DEFAULT_DESCRIPTION`] (sem efeito
//!    após o passo 1, mantido assim);
//! 3. converte `InvoiceDate` para data/hora;
//! 4. mantém apenas `Quantity > 0`;
//! 5. mantém apenas `UnitPrice > 0`;
//! 6. remove duplicatas exatas, preservando a primeira ocorrência.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use crate::config::RowErrorPolicy;
use crate::error::{Result, TransformError};
use crate::traits::Transformer;
use crate::types::{RawTransaction, Transaction, DEFAULT_DESCRIPTION};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// Formatos de data/hora aceitos em `InvoiceDate`
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Contadores da limpeza, por passo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub input_rows: usize,
    pub dropped_missing: usize,
    pub quarantined: usize,
    pub dropped_quantity: usize,
    pub dropped_price: usize,
    pub dropped_duplicates: usize,
    pub output_rows: usize,
}

impl fmt::Display for CleaningStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} linhas (ausentes: {}, datas inválidas: {}, quantidade: {}, preço: {}, duplicadas: {})",
            self.input_rows,
            self.output_rows,
            self.dropped_missing,
            self.quarantined,
            self.dropped_quantity,
            self.dropped_price,
            self.dropped_duplicates
        )
    }
}

/// Resultado da limpeza
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset {
    pub rows: Vec<Transaction>,
    pub stats: CleaningStats,
}

/// Converte um valor de `InvoiceDate`; `None` quando nenhum formato se aplica
pub fn parse_invoice_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Valores vazios ou só com espaços contam como ausentes
fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[derive(PartialEq, Eq, Hash)]
struct RowKey {
    invoice_no: Option<String>,
    stock_code: Option<String>,
    description: String,
    quantity: i64,
    invoice_date: Option<NaiveDateTime>,
    unit_price: u64,
    customer_id: String,
    country: Option<String>,
}

impl From<&Transaction> for RowKey {
    fn from(row: &Transaction) -> Self {
        Self {
            invoice_no: row.invoice_no.clone(),
            stock_code: row.stock_code.clone(),
            description: row.description.clone(),
            quantity: row.quantity,
            invoice_date: row.invoice_date,
            unit_price: row.unit_price.to_bits(),
            customer_id: row.customer_id.clone(),
            country: row.country.clone(),
        }
    }
}

/// Linha que passou pelos passos 1 a 3, com quantidade e preço ainda opcionais
struct Candidate {
    transaction: Transaction,
    quantity: Option<i64>,
    unit_price: Option<f64>,
}

/// Aplica a limpeza ao dataset bruto
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    row_error_policy: RowErrorPolicy,
}

impl Cleaner {
    pub fn new(row_error_policy: RowErrorPolicy) -> Self {
        Self { row_error_policy }
    }

    pub fn clean(&self, rows: Vec<RawTransaction>) -> Result<CleanedDataset> {
        let mut stats = CleaningStats {
            input_rows: rows.len(),
            ..Default::default()
        };

        let mut candidates = Vec::with_capacity(rows.len());
        for (index, raw) in rows.into_iter().enumerate() {
            let customer_id = match raw.customer_id {
                Some(id) if is_present(&raw.description) && !id.trim().is_empty() => id,
                _ => {
                    stats.dropped_missing += 1;
                    continue;
                }
            };
            // Passo 2: sem efeito após o passo 1
            let description = raw
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

            let invoice_date = match raw.invoice_date.as_deref() {
                None => None,
                Some(value) => match parse_invoice_date(value) {
                    Some(date) => Some(date),
                    None if self.row_error_policy == RowErrorPolicy::Skip => {
                        warn!(row = index + 1, value = %value, "Linha com data inválida descartada");
                        stats.quarantined += 1;
                        continue;
                    }
                    None => {
                        return Err(TransformError::DateParse {
                            row: index + 1,
                            value: value.to_string(),
                        }
                        .into())
                    }
                },
            };

            candidates.push(Candidate {
                transaction: Transaction {
                    invoice_no: raw.invoice_no,
                    stock_code: raw.stock_code,
                    description,
                    quantity: raw.quantity.unwrap_or_default(),
                    invoice_date,
                    unit_price: raw.unit_price.unwrap_or_default(),
                    customer_id,
                    country: raw.country,
                },
                quantity: raw.quantity,
                unit_price: raw.unit_price,
            });
        }

        let before = candidates.len();
        candidates.retain(|c| c.quantity.is_some_and(|q| q > 0));
        stats.dropped_quantity = before - candidates.len();

        let before = candidates.len();
        candidates.retain(|c| c.unit_price.is_some_and(|p| p > 0.0));
        stats.dropped_price = before - candidates.len();

        let mut seen = HashSet::with_capacity(candidates.len());
        let mut cleaned = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if seen.insert(RowKey::from(&candidate.transaction)) {
                cleaned.push(candidate.transaction);
            } else {
                stats.dropped_duplicates += 1;
            }
        }
        stats.output_rows = cleaned.len();

        info!(
            input_rows = stats.input_rows,
            output_rows = stats.output_rows,
            "Limpeza concluída: {}",
            stats
        );

        Ok(CleanedDataset { rows: cleaned, stats })
    }
}

#[async_trait]
impl Transformer for Cleaner {
    type Input = RawTransaction;
    type Output = CleanedDataset;

    async fn transform(&self, data: Vec<RawTransaction>) -> Result<CleanedDataset> {
        self.clean(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    fn raw(invoice: &str, quantity: i64, customer: Option<&str>) -> RawTransaction {
        RawTransaction {
            invoice_no: Some(invoice.to_string()),
            stock_code: Some("85123A".to_string()),
            description: Some("WHITE HANGING HEART T-LIGHT HOLDER".to_string()),
            quantity: Some(quantity),
            invoice_date: Some("12/1/2010 8:26".to_string()),
            unit_price: Some(2.55),
            customer_id: customer.map(str::to_string),
            country: Some("United Kingdom".to_string()),
        }
    }

    #[test]
    fn test_five_row_scenario_keeps_two() {
        let rows = vec![
            raw("536365", 6, Some("17850")),
            raw("536366", 2, None),
            raw("536367", -1, Some("17850")),
            raw("536365", 6, Some("17850")),
            raw("536368", 3, Some("13047")),
        ];

        let cleaned = Cleaner::default().clean(rows).unwrap();

        assert_eq!(cleaned.rows.len(), 2);
        assert_eq!(cleaned.rows[0].invoice_no.as_deref(), Some("536365"));
        assert_eq!(cleaned.rows[1].invoice_no.as_deref(), Some("536368"));
        assert_eq!(
            cleaned.stats,
            CleaningStats {
                input_rows: 5,
                dropped_missing: 1,
                quarantined: 0,
                dropped_quantity: 1,
                dropped_price: 0,
                dropped_duplicates: 1,
                output_rows: 2,
            }
        );
    }

    #[test]
    fn test_missing_description_is_dropped() {
        let mut row = raw("1", 1, Some("10"));
        row.description = None;
        let cleaned = Cleaner::default().clean(vec![row]).unwrap();
        assert!(cleaned.rows.is_empty());
        assert_eq!(cleaned.stats.dropped_missing, 1);
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        let mut empty_description = raw("1", 1, Some("10"));
        empty_description.description = Some(String::new());
        let mut blank_description = raw("2", 1, Some("10"));
        blank_description.description = Some("   ".to_string());
        let blank_customer = raw("3", 1, Some(" "));

        let cleaned = Cleaner::default()
            .clean(vec![empty_description, blank_description, blank_customer, raw("4", 1, Some("10"))])
            .unwrap();

        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.stats.dropped_missing, 3);
        assert!(cleaned.rows.iter().all(|row| row.description != DEFAULT_DESCRIPTION));
    }

    #[test]
    fn test_non_positive_price_and_missing_numbers_are_dropped() {
        let mut zero_price = raw("1", 1, Some("10"));
        zero_price.unit_price = Some(0.0);
        let mut no_quantity = raw("2", 1, Some("10"));
        no_quantity.quantity = None;
        let mut no_price = raw("3", 1, Some("10"));
        no_price.unit_price = None;

        let cleaned = Cleaner::default()
            .clean(vec![zero_price, no_quantity, no_price])
            .unwrap();

        assert!(cleaned.rows.is_empty());
        assert_eq!(cleaned.stats.dropped_quantity, 1);
        assert_eq!(cleaned.stats.dropped_price, 2);
    }

    #[test]
    fn test_dates_are_parsed() {
        let mut iso = raw("2", 1, Some("10"));
        iso.invoice_date = Some("2011-12-09 12:50:00".to_string());
        let mut missing = raw("3", 1, Some("10"));
        missing.invoice_date = None;

        let cleaned = Cleaner::default()
            .clean(vec![raw("1", 1, Some("10")), iso, missing])
            .unwrap();

        let expected = NaiveDate::from_ymd_opt(2010, 12, 1)
            .and_then(|d| d.and_hms_opt(8, 26, 0));
        assert_eq!(cleaned.rows[0].invoice_date, expected);
        assert_eq!(
            cleaned.rows[1].invoice_date,
            NaiveDate::from_ymd_opt(2011, 12, 9).and_then(|d| d.and_hms_opt(12, 50, 0))
        );
        assert_eq!(cleaned.rows[2].invoice_date, None);
    }

    #[test]
    fn test_invalid_date_aborts_by_default() {
        let mut row = raw("1", 1, Some("10"));
        row.invoice_date = Some("ontem".to_string());

        let err = Cleaner::default()
            .clean(vec![raw("0", 1, Some("10")), row])
            .unwrap_err();
        assert!(matches!(
            err,
            EtlError::Transform(TransformError::DateParse { row: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_date_quarantined_with_skip() {
        let mut row = raw("1", 1, Some("10"));
        row.invoice_date = Some("ontem".to_string());

        let cleaned = Cleaner::new(RowErrorPolicy::Skip)
            .clean(vec![row, raw("2", 1, Some("10"))])
            .unwrap();
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.stats.quarantined, 1);
    }

    #[test]
    fn test_duplicates_differ_by_any_field() {
        let a = raw("1", 1, Some("10"));
        let mut b = a.clone();
        b.country = Some("France".to_string());

        let cleaned = Cleaner::default().clean(vec![a.clone(), b, a]).unwrap();
        assert_eq!(cleaned.rows.len(), 2);
        assert_eq!(cleaned.stats.dropped_duplicates, 1);
    }

    #[test]
    fn test_cleaning_is_deterministic() {
        let rows: Vec<_> = (0..20)
            .map(|i| raw(&format!("{}", 536000 + i % 7), i % 5 - 1, Some("10")))
            .collect();
        let first = Cleaner::default().clean(rows.clone()).unwrap();
        let second = Cleaner::default().clean(rows).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cleaner_as_transformer() {
        let cleaned = Cleaner::default()
            .transform(vec![raw("1", 2, Some("10"))])
            .await
            .unwrap();
        assert_eq!(cleaned.stats.output_rows, 1);
    }
}
