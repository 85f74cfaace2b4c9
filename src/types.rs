use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descrição usada para preencher descrições ausentes
pub const DEFAULT_DESCRIPTION: &str = "Unknown";

/// Formato de data/hora usado no snapshot CSV e na carga do warehouse
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tipos de coluna conhecidos pelo schema das transações
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Timestamp,
}

impl ColumnType {
    /// Nome do tipo como exibido no resumo de inspeção
    pub fn dtype(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::Timestamp => "datetime",
        }
    }
}

/// Coluna do schema: nome no CSV de origem e tipo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
}

const fn column(name: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec { name, column_type }
}

/// Schema do dataset bruto, na ordem do arquivo de origem
pub const RAW_COLUMNS: [ColumnSpec; 8] = [
    column("InvoiceNo", ColumnType::String),
    column("StockCode", ColumnType::String),
    column("Description", ColumnType::String),
    column("Quantity", ColumnType::Integer),
    column("InvoiceDate", ColumnType::String),
    column("UnitPrice", ColumnType::Float),
    column("CustomerID", ColumnType::String),
    column("Country", ColumnType::String),
];

/// Schema das linhas transformadas enviadas ao warehouse
pub const REVENUE_COLUMNS: [ColumnSpec; 9] = [
    column("InvoiceNo", ColumnType::String),
    column("StockCode", ColumnType::String),
    column("Description", ColumnType::String),
    column("Quantity", ColumnType::Integer),
    column("InvoiceDate", ColumnType::Timestamp),
    column("UnitPrice", ColumnType::Float),
    column("CustomerID", ColumnType::String),
    column("Country", ColumnType::String),
    column("TotalRevenue", ColumnType::Float),
];

/// Linha do dataset como extraída, antes da limpeza.
///
/// Toda coluna pode estar ausente; as numéricas já estão tipadas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTransaction {
    pub invoice_no: Option<String>,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub invoice_date: Option<String>,
    pub unit_price: Option<f64>,
    pub customer_id: Option<String>,
    pub country: Option<String>,
}

impl RawTransaction {
    /// Indica quais colunas estão ausentes, na ordem de `RAW_COLUMNS`, sem copiar valores
    pub fn missing(&self) -> [bool; 8] {
        [
            self.invoice_no.is_none(),
            self.stock_code.is_none(),
            self.description.is_none(),
            self.quantity.is_none(),
            self.invoice_date.is_none(),
            self.unit_price.is_none(),
            self.customer_id.is_none(),
            self.country.is_none(),
        ]
    }

    /// Valores da linha formatados para exibição, na ordem de `RAW_COLUMNS`
    pub fn cells(&self) -> [Option<String>; 8] {
        [
            self.invoice_no.clone(),
            self.stock_code.clone(),
            self.description.clone(),
            self.quantity.map(|q| q.to_string()),
            self.invoice_date.clone(),
            self.unit_price.map(|p| p.to_string()),
            self.customer_id.clone(),
            self.country.clone(),
        ]
    }
}

/// Transação após a limpeza
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "InvoiceNo")]
    pub invoice_no: Option<String>,
    #[serde(rename = "StockCode")]
    pub stock_code: Option<String>,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "InvoiceDate", with = "optional_datetime")]
    pub invoice_date: Option<NaiveDateTime>,
    #[serde(rename = "UnitPrice")]
    pub unit_price: f64,
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    #[serde(rename = "Country")]
    pub country: Option<String>,
}

impl Transaction {
    /// Receita da linha: quantidade × preço unitário
    pub fn revenue(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Transação com a coluna de receita derivada
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueRecord {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(rename = "TotalRevenue")]
    pub total_revenue: f64,
}

mod optional_datetime {
    use super::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.format(DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.is_empty() => NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Identificador de uma tabela do warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Resultado de uma carga bem-sucedida
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub table: TableRef,
    pub rows_loaded: usize,
    pub job_id: Option<String>,
}

/// Desfecho da etapa de carga.
///
/// Uma falha de carga não interrompe o pipeline: ela é registrada aqui e no log.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(LoadSummary),
    Failed { message: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }
}

/// Estados do pipeline para rastreamento de execução
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Extracting,
    Inspecting,
    Cleaning,
    Persisting,
    Transforming,
    Loading,
    Completed,
    Failed(String),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "Ocioso"),
            PipelineState::Extracting => write!(f, "Extraindo"),
            PipelineState::Inspecting => write!(f, "Inspecionando"),
            PipelineState::Cleaning => write!(f, "Limpando"),
            PipelineState::Persisting => write!(f, "Persistindo"),
            PipelineState::Transforming => write!(f, "Transformando"),
            PipelineState::Loading => write!(f, "Carregando"),
            PipelineState::Completed => write!(f, "Concluído"),
            PipelineState::Failed(error) => write!(f, "Falhou: {}", error),
        }
    }
}

/// Eventos do pipeline para monitoramento externo
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Pipeline iniciado
    Started {
        pipeline_id: String,
        timestamp: std::time::SystemTime,
    },
    /// Estado alterado
    StateChanged {
        pipeline_id: String,
        old_state: PipelineState,
        new_state: PipelineState,
        timestamp: std::time::SystemTime,
    },
    /// Etapa concluída com o número de linhas produzidas
    StageCompleted {
        pipeline_id: String,
        stage: PipelineState,
        rows: usize,
        timestamp: std::time::SystemTime,
    },
    /// Erro ocorreu
    Error {
        pipeline_id: String,
        error: String,
        timestamp: std::time::SystemTime,
    },
    /// Pipeline concluído
    Completed {
        pipeline_id: String,
        rows_cleaned: usize,
        load_succeeded: bool,
        execution_time_ms: u64,
        timestamp: std::time::SystemTime,
    },
}
