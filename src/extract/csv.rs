use async_trait::async_trait;
use crate::config::RowErrorPolicy;
use crate::error::{ExtractError, Result};
use crate::extract::archive;
use crate::extract::encoding::EncodingPolicy;
use crate::traits::{DatasetSource, Extractor};
use crate::types::RawTransaction;
use std::sync::Arc;
use tracing::{info, warn};

/// Extrator das transações de e-commerce.
///
/// Obtém o arquivo pela [`DatasetSource`], abre o zip quando necessário,
/// decodifica o texto com a política de codificação e converte cada linha em
/// [`RawTransaction`].
#[derive(Clone)]
pub struct TransactionExtractor {
    source: Arc<dyn DatasetSource>,
    encoding: EncodingPolicy,
    csv_entry: Option<String>,
    row_error_policy: RowErrorPolicy,
    delimiter: u8,
}

impl TransactionExtractor {
    /// Cria um novo extrator para a fonte informada
    pub fn new<S: DatasetSource + 'static>(source: S) -> Self {
        Self::from_source(Arc::new(source))
    }

    pub fn from_source(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            encoding: EncodingPolicy::default(),
            csv_entry: None,
            row_error_policy: RowErrorPolicy::Fail,
            delimiter: b',',
        }
    }

    /// Define a política de codificação
    pub fn with_encoding(mut self, encoding: EncodingPolicy) -> Self {
        self.encoding = encoding;
        self
    }

    /// Define a entrada do zip que contém o CSV
    pub fn with_csv_entry(mut self, entry: impl Into<String>) -> Self {
        self.csv_entry = Some(entry.into());
        self
    }

    /// Define o tratamento de valores que não podem ser convertidos
    pub fn with_row_error_policy(mut self, policy: RowErrorPolicy) -> Self {
        self.row_error_policy = policy;
        self
    }

    /// Define o delimitador
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Converte o conteúdo de um arquivo (zip ou CSV) em transações brutas
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<RawTransaction>> {
        let payload;
        let csv_bytes = if archive::is_zip(bytes) {
            payload = archive::read_csv_entry(bytes, self.csv_entry.as_deref())?;
            payload.as_slice()
        } else {
            bytes
        };

        let text = self.encoding.decode(csv_bytes)?;
        let parsed = parse_transactions(&text, self.delimiter, self.row_error_policy)?;

        if parsed.skipped > 0 {
            warn!(
                skipped = parsed.skipped,
                "Linhas descartadas por valores que não puderam ser convertidos"
            );
        }
        Ok(parsed.rows)
    }
}

impl std::fmt::Debug for TransactionExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionExtractor")
            .field("source", &self.source.describe())
            .field("encoding", &self.encoding)
            .field("csv_entry", &self.csv_entry)
            .field("row_error_policy", &self.row_error_policy)
            .finish()
    }
}

#[async_trait]
impl Extractor for TransactionExtractor {
    async fn extract(&self) -> Result<Vec<RawTransaction>> {
        let path = self.source.fetch().await?;
        let bytes = tokio::fs::read(&path).await?;
        let rows = self.parse_bytes(&bytes)?;

        info!(
            source = %self.source.describe(),
            rows = rows.len(),
            "Dataset extraído"
        );
        Ok(rows)
    }
}

/// Linhas convertidas e quantidade descartada pela política `Skip`
#[derive(Debug, Clone, Default)]
pub struct ParsedTransactions {
    pub rows: Vec<RawTransaction>,
    pub skipped: usize,
}

/// Posição de cada coluna conhecida no cabeçalho do arquivo
struct ColumnIndex {
    invoice_no: usize,
    stock_code: Option<usize>,
    description: usize,
    quantity: usize,
    invoice_date: usize,
    unit_price: usize,
    customer_id: usize,
    country: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                crate::error::EtlError::from(ExtractError::InvalidFormat(format!(
                    "coluna obrigatória ausente: {}",
                    name
                )))
            })
        };

        Ok(Self {
            invoice_no: require("InvoiceNo")?,
            stock_code: find("StockCode"),
            description: require("Description")?,
            quantity: require("Quantity")?,
            invoice_date: require("InvoiceDate")?,
            unit_price: require("UnitPrice")?,
            customer_id: require("CustomerID")?,
            country: require("Country")?,
        })
    }
}

/// Converte o texto CSV em transações brutas, tipando as colunas numéricas.
///
/// Campos vazios viram `None`. Um valor numérico inválido aborta a leitura com
/// `RowErrorPolicy::Fail` ou descarta a linha com `RowErrorPolicy::Skip`.
pub fn parse_transactions(
    text: &str,
    delimiter: u8,
    policy: RowErrorPolicy,
) -> Result<ParsedTransactions> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let columns = ColumnIndex::from_headers(reader.headers()?)?;
    let mut parsed = ParsedTransactions::default();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        match convert_record(&record, &columns, line) {
            Ok(row) => parsed.rows.push(row),
            Err(err) if policy == RowErrorPolicy::Skip => {
                warn!(line = line, error = %err, "Linha descartada");
                parsed.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(parsed)
}

fn cell(record: &csv::StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn convert_record(
    record: &csv::StringRecord,
    columns: &ColumnIndex,
    line: usize,
) -> Result<RawTransaction> {
    let parse_error = |column: &str, value: &str| {
        crate::error::EtlError::from(ExtractError::ParseError {
            row: line,
            column: column.to_string(),
            value: value.to_string(),
        })
    };

    let quantity = match cell(record, columns.quantity) {
        Some(value) => Some(parse_quantity(&value).ok_or_else(|| parse_error("Quantity", &value))?),
        None => None,
    };

    let unit_price = match cell(record, columns.unit_price) {
        Some(value) => Some(
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|price| price.is_finite())
                .ok_or_else(|| parse_error("UnitPrice", &value))?,
        ),
        None => None,
    };

    Ok(RawTransaction {
        invoice_no: cell(record, columns.invoice_no),
        stock_code: columns.stock_code.and_then(|i| cell(record, i)),
        description: cell(record, columns.description),
        quantity,
        invoice_date: cell(record, columns.invoice_date),
        unit_price,
        customer_id: cell(record, columns.customer_id),
        country: cell(record, columns.country),
    })
}

// Limites exatos de i64 em f64: -2^63 (incluso) e 2^63 (excluso)
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Aceita inteiros e também floats sem parte fracionária ("6.0") dentro da faixa de i64
fn parse_quantity(value: &str) -> Option<i64> {
    let value = value.trim();
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|q| q.fract() == 0.0 && *q >= I64_LOWER && *q < I64_UPPER)
            .map(|q| q as i64)
    })
}
