//! # Snapshot CSV
//!
//! Serialização do dataset limpo no CSV gravado no bucket. O cabeçalho é
//! sempre escrito, mesmo sem linhas, e a saída é determinística.

use crate::error::{LoadError, Result};
use crate::types::{Transaction, RAW_COLUMNS};
use std::path::Path;

/// Serializa as transações limpas como CSV, com cabeçalho e sem índice
pub fn to_csv_bytes(rows: &[Transaction]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(RAW_COLUMNS.iter().map(|c| c.name))?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| LoadError::WriteError(e.to_string()).into())
}

/// Grava o snapshot em um arquivo local, criando o diretório se necessário
pub async fn write_csv<P: AsRef<Path>>(path: P, rows: &[Transaction]) -> Result<usize> {
    let path = path.as_ref();
    let bytes = to_csv_bytes(rows)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, &bytes).await?;
    Ok(bytes.len())
}
