//! Leitura do CSV contido no arquivo zip do dataset.

use crate::error::{ExtractError, Result};
use std::io::{Cursor, Read};
use zip::ZipArchive;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// Indica se os bytes começam com a assinatura de um arquivo zip
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_SIGNATURE)
}

/// Lê o payload CSV do zip.
///
/// Com `entry`, lê exatamente essa entrada; sem ela, o zip precisa conter um
/// único arquivo `.csv`.
pub fn read_csv_entry(bytes: &[u8], entry: Option<&str>) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let name = match entry {
        Some(name) => name.to_string(),
        None => {
            let candidates: Vec<String> = archive
                .file_names()
                .filter(|name| name.to_lowercase().ends_with(".csv"))
                .map(str::to_string)
                .collect();

            match candidates.as_slice() {
                [single] => single.clone(),
                [] => {
                    return Err(ExtractError::Archive(
                        "nenhum arquivo CSV no arquivo compactado".to_string(),
                    )
                    .into())
                }
                many => {
                    return Err(ExtractError::Archive(format!(
                        "mais de um CSV no arquivo compactado: {}",
                        many.join(", ")
                    ))
                    .into())
                }
            }
        }
    };

    let mut file = archive
        .by_name(&name)
        .map_err(|_| ExtractError::FileNotFound(format!("entrada '{}' no zip", name)))?;

    let mut payload = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut payload)?;

    tracing::debug!(entry = %name, bytes = payload.len(), "Entrada CSV lida do zip");
    Ok(payload)
}

#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
