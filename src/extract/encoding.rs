//! Decodificação do payload CSV com uma única codificação de reserva.

use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Codificações de texto suportadas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[serde(alias = "utf-8")]
    Utf8,
    #[serde(alias = "latin-1", alias = "iso-8859-1")]
    Latin1,
    #[serde(alias = "us-ascii")]
    Ascii,
}

impl TextEncoding {
    /// Rótulo canônico da codificação
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "iso-8859-1",
            TextEncoding::Ascii => "us-ascii",
        }
    }

    /// Decodifica os bytes; `None` se não forem válidos nesta codificação
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_owned)
            }
            // ISO-8859-1 mapeia cada byte para o code point de mesmo valor
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Codificação primária com uma tentativa de reserva
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingPolicy {
    pub primary: TextEncoding,
    pub fallback: TextEncoding,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            primary: TextEncoding::Utf8,
            fallback: TextEncoding::Latin1,
        }
    }
}

impl EncodingPolicy {
    pub fn new(primary: TextEncoding, fallback: TextEncoding) -> Self {
        Self { primary, fallback }
    }

    /// Decodifica com a primária e, se falhar, com a reserva. Não há terceira tentativa.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        if let Some(text) = self.primary.decode(bytes) {
            return Ok(text);
        }

        warn!(
            primary = self.primary.label(),
            fallback = self.fallback.label(),
            "Falha ao decodificar com a codificação primária, tentando a de reserva"
        );

        self.fallback.decode(bytes).ok_or_else(|| {
            ExtractError::Decode {
                encoding: self.fallback.label().to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    // "Café" em ISO-8859-1: 0xE9 sozinho é UTF-8 inválido
    const LATIN1_CAFE: &[u8] = b"Caf\xe9";

    #[test]
    fn test_primary_succeeds() {
        let policy = EncodingPolicy::default();
        assert_eq!(policy.decode("Café".as_bytes()).unwrap(), "Café");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let policy = EncodingPolicy::default();
        assert_eq!(policy.decode(b"\xEF\xBB\xBFInvoiceNo").unwrap(), "InvoiceNo");
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let policy = EncodingPolicy::default();
        assert_eq!(policy.decode(LATIN1_CAFE).unwrap(), "Café");
    }

    #[test]
    fn test_fallback_failure_is_fatal() {
        let policy = EncodingPolicy::new(TextEncoding::Utf8, TextEncoding::Ascii);
        let err = policy.decode(LATIN1_CAFE).unwrap_err();
        assert!(matches!(
            err,
            EtlError::Extract(ExtractError::Decode { ref encoding }) if encoding == "us-ascii"
        ));
    }

    #[test]
    fn test_latin1_never_fails() {
        let all_bytes: Vec<u8> = (0..=255u8).collect();
        let text = TextEncoding::Latin1.decode(&all_bytes).unwrap();
        assert_eq!(text.chars().count(), 256);
    }
}
