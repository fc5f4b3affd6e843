// SPDX-License-Identifier: Apache-2.0

use crate::load_error::LoadError;

pub const PATIENT_ARCHIVE: &str = "patient_clean";

/// If `bytes` is an `archive,path` index, returns the path listed for the
/// patient archive. Anything else is taken to be the table itself.
pub fn patient_table_path(bytes: &[u8]) -> Result<Option<String>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let Ok(headers) = reader.headers() else {
        return Ok(None);
    };
    let archive_col = headers.iter().position(|h| h.trim() == "archive");
    let path_col = headers.iter().position(|h| h.trim() == "path");
    let (Some(archive_col), Some(path_col)) = (archive_col, path_col) else {
        return Ok(None);
    };
    for row in reader.records().flatten() {
        if row.get(archive_col).map(str::trim) == Some(PATIENT_ARCHIVE) {
            let path = row.get(path_col).map(str::trim).unwrap_or("");
            if path.is_empty() {
                break;
            }
            return Ok(Some(path.to_string()));
        }
    }
    Err(LoadError::invalid(format!(
        "index lists no usable {PATIENT_ARCHIVE:?} archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_patient_archive_row() {
        let index = b"archive,path\nimages,2021/images.csv\npatient_clean,2021/patient_clean.csv\n";
        assert_eq!(
            patient_table_path(index).expect("index"),
            Some("2021/patient_clean.csv".to_string())
        );
    }

    #[test]
    fn patient_table_is_not_an_index() {
        assert_eq!(patient_table_path(b"Pseudonym,group\np1,training\n").expect("table"), None);
    }

    #[test]
    fn index_without_patient_archive_is_invalid() {
        let err = patient_table_path(b"archive,path\nimages,x.csv\n").expect_err("missing");
        assert_eq!(err.code, crate::LoadErrorCode::InvalidSource);
        assert!(patient_table_path(b"archive,path\npatient_clean,\n").is_err());
    }
}
