//! Backup export and parsing
//!
//! A backup is the whole snapshot serialized as JSON, the same document the
//! store persists. Parsing never touches the live snapshot; restoring goes
//! through [`crate::Books::restore_backup`].

use crate::{types::AppState, Error, Result};
use chrono::NaiveDate;
use std::io::{Read, Write};

/// Write the full snapshot as JSON
pub fn export_backup<W: Write>(state: &AppState, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, state)?;
    writer.flush()?;

    tracing::info!(
        parties = state.parties.len(),
        invoices = state.invoices.len(),
        treasury = state.treasury.len(),
        "Exported backup"
    );
    Ok(())
}

/// `books_backup_DD-MM-YYYY.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("books_backup_{}.json", date.format("%d-%m-%Y"))
}

/// Parse a backup document
pub fn parse_backup<R: Read>(reader: R) -> Result<AppState> {
    let value: serde_json::Value = serde_json::from_reader(reader)
        .map_err(|e| Error::Backup(format!("Backup is not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(Error::Backup("Backup must be a JSON object".to_string()));
    }

    serde_json::from_value(value)
        .map_err(|e| Error::Backup(format!("Backup does not match the snapshot layout: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompanyInfo;

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(backup_file_name(date), "books_backup_07-01-2024.json");
    }

    #[test]
    fn test_export_then_parse() {
        let state = AppState {
            categories: vec!["retail".to_string()],
            company_info: CompanyInfo {
                name: "Arkan".to_string(),
                ..CompanyInfo::default()
            },
            ..AppState::default()
        };

        let mut buf = Vec::new();
        export_backup(&state, &mut buf).unwrap();
        assert_eq!(parse_backup(buf.as_slice()).unwrap(), state);
    }

    #[test]
    fn test_malformed_backup() {
        assert!(matches!(parse_backup(&b"{oops"[..]), Err(Error::Backup(_))));
        assert!(matches!(parse_backup(&b"[1, 2]"[..]), Err(Error::Backup(_))));
        assert!(matches!(
            parse_backup(&br#"{"parties": "nope"}"#[..]),
            Err(Error::Backup(_))
        ));
    }

    #[test]
    fn test_partial_backup_defaults_missing_fields() {
        let state = parse_backup(&br#"{"categories": ["a"]}"#[..]).unwrap();
        assert_eq!(state.categories, vec!["a".to_string()]);
        assert!(state.users.is_empty());
    }
}
