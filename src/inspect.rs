//! # Inspector
//!
//! Resumo diagnóstico do dataset bruto: primeiras linhas, tipos por coluna e
//! contagem de valores ausentes. Não altera os dados.

use crate::types::{RawTransaction, RAW_COLUMNS};
use std::fmt;
use tracing::info;

/// Resumo de uma coluna do dataset
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: &'static str,
    pub dtype: &'static str,
    pub non_null: usize,
    pub nulls: usize,
}

/// Relatório produzido pela inspeção
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    pub row_count: usize,
    pub preview: Vec<RawTransaction>,
    pub columns: Vec<ColumnSummary>,
}

impl InspectionReport {
    /// Resumo de uma coluna pelo nome
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RAW_COLUMNS.map(|c| c.name).join(" | "))?;
        for row in &self.preview {
            let cells = row.cells().map(|c| c.unwrap_or_else(|| "NaN".to_string()));
            writeln!(f, "{}", cells.join(" | "))?;
        }

        writeln!(f)?;
        writeln!(f, "{} entradas, {} colunas", self.row_count, self.columns.len())?;
        for column in &self.columns {
            writeln!(
                f,
                "  {:<12} {:>8} non-null  {}",
                column.name, column.non_null, column.dtype
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Valores ausentes:")?;
        for column in &self.columns {
            writeln!(f, "  {:<12} {}", column.name, column.nulls)?;
        }
        Ok(())
    }
}

/// Gera o relatório de inspeção do dataset bruto
#[derive(Debug, Clone)]
pub struct Inspector {
    preview_rows: usize,
}

impl Default for Inspector {
    fn default() -> Self {
        Self { preview_rows: 5 }
    }
}

impl Inspector {
    pub fn new(preview_rows: usize) -> Self {
        Self { preview_rows }
    }

    pub fn inspect(&self, rows: &[RawTransaction]) -> InspectionReport {
        let mut nulls = [0usize; RAW_COLUMNS.len()];
        for row in rows {
            for (count, missing) in nulls.iter_mut().zip(row.missing()) {
                *count += usize::from(missing);
            }
        }

        let columns = RAW_COLUMNS
            .iter()
            .zip(nulls)
            .map(|(spec, nulls)| ColumnSummary {
                name: spec.name,
                dtype: spec.column_type.dtype(),
                non_null: rows.len() - nulls,
                nulls,
            })
            .collect();

        let report = InspectionReport {
            row_count: rows.len(),
            preview: rows.iter().take(self.preview_rows).cloned().collect(),
            columns,
        };

        info!(rows = report.row_count, "Inspeção do dataset:\n{}", report);
        report
    }
}
