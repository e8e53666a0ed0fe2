//! Bulk party import
//!
//! Candidate parties are read from an Excel workbook (first sheet) or a CSV
//! sheet for preview; nothing is added until the caller confirms the batch
//! through `Books::import_parties`. Each logical column may carry an English
//! or an Arabic header.

use crate::{
    types::{Party, PartyId, PartyKind},
    Error, Result,
};
use calamine::{Reader, Xlsx};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::str::FromStr;

const DEFAULT_CATEGORY: &str = "عام";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Code,
    Name,
    Kind,
    Category,
    Phone,
    Balance,
}

impl Column {
    const ALL: [Column; 6] = [
        Column::Code,
        Column::Name,
        Column::Kind,
        Column::Category,
        Column::Phone,
        Column::Balance,
    ];

    fn headers(&self) -> [&'static str; 2] {
        match self {
            Column::Code => ["code", "كود"],
            Column::Name => ["name", "الاسم"],
            Column::Kind => ["type", "النوع"],
            Column::Category => ["category", "التصنيف"],
            Column::Phone => ["phone", "الهاتف"],
            Column::Balance => ["balance", "الرصيد"],
        }
    }
}

/// Header positions of each logical column, English first
struct Layout {
    positions: Vec<(Column, Vec<usize>)>,
}

impl Layout {
    fn from_headers(headers: &[String]) -> Self {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let positions = Column::ALL
            .iter()
            .map(|column| {
                let found = column
                    .headers()
                    .iter()
                    .filter_map(|name| normalized.iter().position(|h| h == name))
                    .collect();
                (*column, found)
            })
            .collect();

        Self { positions }
    }

    fn has_any(&self) -> bool {
        self.positions.iter().any(|(_, found)| !found.is_empty())
    }

    /// First non-empty cell among the column's headers
    fn cell<'r>(&self, row: &'r [String], column: Column) -> Option<&'r str> {
        self.positions
            .iter()
            .find(|(c, _)| *c == column)
            .into_iter()
            .flat_map(|(_, found)| found.iter())
            .filter_map(|&idx| row.get(idx))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    fn party(&self, row: &[String]) -> Party {
        let balance = parse_balance(self.cell(row, Column::Balance));
        Party {
            id: PartyId::generate(),
            code: self.cell(row, Column::Code).unwrap_or_default().to_string(),
            name: self.cell(row, Column::Name).unwrap_or_default().to_string(),
            kind: parse_kind(self.cell(row, Column::Kind)),
            category: self
                .cell(row, Column::Category)
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            phone: self.cell(row, Column::Phone).unwrap_or_default().to_string(),
            opening_balance: balance,
            current_balance: balance,
        }
    }
}

fn parse_kind(raw: Option<&str>) -> PartyKind {
    match raw {
        Some("مورد") => PartyKind::Supplier,
        Some(other) if other.eq_ignore_ascii_case("supplier") => PartyKind::Supplier,
        Some(other) if other.eq_ignore_ascii_case("both") => PartyKind::Both,
        _ => PartyKind::Customer,
    }
}

fn parse_balance(raw: Option<&str>) -> Decimal {
    raw.and_then(|value| Decimal::from_str(&value.replace(',', "")).ok())
        .unwrap_or(Decimal::ZERO)
}

/// Map a header row and data rows to candidate parties
fn parties_from_rows<I>(headers: &[String], rows: I) -> Result<Vec<Party>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let layout = Layout::from_headers(headers);
    if !layout.has_any() {
        return Err(Error::Import(
            "Sheet has none of the expected party columns".to_string(),
        ));
    }

    let parties: Vec<Party> = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| layout.party(&row))
        .collect();

    tracing::info!(rows = parties.len(), "Read party import preview");
    Ok(parties)
}

/// Read candidate parties from a CSV sheet
pub fn preview_parties<R: Read>(reader: R) -> Result<Vec<Party>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let rows = rdr
        .records()
        .map(|record| -> Result<Vec<String>> { Ok(record?.iter().map(str::to_string).collect()) })
        .collect::<Result<Vec<Vec<String>>>>()?;

    parties_from_rows(&headers, rows)
}

/// Read candidate parties from the first sheet of an Excel workbook
pub fn preview_parties_xlsx<R: Read + Seek>(reader: R) -> Result<Vec<Party>> {
    let mut workbook = Xlsx::new(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Import("Workbook has no sheets".to_string()))??;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers = match rows.next() {
        Some(headers) => headers,
        None => return Err(Error::Import("Sheet is empty".to_string())),
    };

    parties_from_rows(&headers, rows)
}

/// Read candidate parties from a file, by extension: `.xlsx`/`.xlsm` as a
/// workbook, anything else as CSV
pub fn preview_parties_file(path: &Path) -> Result<Vec<Party>> {
    let file = BufReader::new(File::open(path)?);
    let is_workbook = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"));

    tracing::debug!(path = %path.display(), is_workbook, "Reading party import file");
    if is_workbook {
        preview_parties_xlsx(file)
    } else {
        preview_parties(file)
    }
}

/// Invoice sheets are not imported
pub fn preview_invoices<R: Read>(_reader: R) -> Result<()> {
    Err(Error::Unsupported("invoice import".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_headers() {
        let sheet = "Code,Name,Type,Category,Phone,Balance\n\
                     C1,Ali,Customer,retail,0100,150.5\n\
                     S1,Nile Supply,Supplier,,,oops\n";
        let parties = preview_parties(sheet.as_bytes()).unwrap();

        assert_eq!(parties.len(), 2);
        assert_eq!(parties[0].code, "C1");
        assert_eq!(parties[0].opening_balance, Decimal::new(1505, 1));
        assert_eq!(parties[0].current_balance, parties[0].opening_balance);
        assert_eq!(parties[1].kind, PartyKind::Supplier);
        assert_eq!(parties[1].category, DEFAULT_CATEGORY);
        assert_eq!(parties[1].opening_balance, Decimal::ZERO);
    }

    #[test]
    fn test_arabic_headers() {
        let sheet = "كود,الاسم,النوع,التصنيف,الهاتف,الرصيد\n\
                     7,شركة النيل,مورد,موردين,0123,-20\n\
                     8,محمد,عميل,,,\n";
        let parties = preview_parties(sheet.as_bytes()).unwrap();

        assert_eq!(parties[0].name, "شركة النيل");
        assert_eq!(parties[0].kind, PartyKind::Supplier);
        assert_eq!(parties[0].opening_balance, Decimal::from(-20));
        assert_eq!(parties[1].kind, PartyKind::Customer);
        assert_eq!(parties[1].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_mixed_headers_prefer_first_non_empty() {
        let sheet = "Name,الاسم,Balance\n,Omar,\"1,200\"\n";
        let parties = preview_parties(sheet.as_bytes()).unwrap();
        assert_eq!(parties[0].name, "Omar");
        assert_eq!(parties[0].opening_balance, Decimal::from(1200));
    }

    #[test]
    fn test_unrecognized_sheet() {
        let err = preview_parties("foo,bar\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_workbook_rows_share_header_mapping() {
        // Cell text as calamine renders it: numbers lose trailing zeros
        let headers = row(&["الاسم", "Type", "Phone", "الرصيد"]);
        let rows = vec![
            row(&["Delta Foods", "supplier", "100200", "1500"]),
            row(&["", "", "", ""]),
            row(&["Sara", "", "", "-7.5"]),
        ];
        let parties = parties_from_rows(&headers, rows).unwrap();

        assert_eq!(parties.len(), 2);
        assert_eq!(parties[0].name, "Delta Foods");
        assert_eq!(parties[0].kind, PartyKind::Supplier);
        assert_eq!(parties[0].phone, "100200");
        assert_eq!(parties[0].opening_balance, Decimal::from(1500));
        assert_eq!(parties[1].kind, PartyKind::Customer);
        assert_eq!(parties[1].current_balance, Decimal::new(-75, 1));
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let headers = row(&["code", "name", "balance"]);
        let parties = parties_from_rows(&headers, vec![row(&["C9"])]).unwrap();
        assert_eq!(parties[0].code, "C9");
        assert_eq!(parties[0].name, "");
        assert_eq!(parties[0].opening_balance, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_workbook_is_an_import_error() {
        let err = preview_parties_xlsx(std::io::Cursor::new(b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn test_file_dispatch_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("parties.csv");
        std::fs::write(&csv_path, "name,balance\nHany,10\n").unwrap();
        let parties = preview_parties_file(&csv_path).unwrap();
        assert_eq!(parties[0].name, "Hany");

        let xlsx_path = dir.path().join("parties.XLSX");
        std::fs::write(&xlsx_path, "name,balance\nHany,10\n").unwrap();
        assert!(matches!(
            preview_parties_file(&xlsx_path).unwrap_err(),
            Error::Import(_)
        ));
    }

    #[test]
    fn test_invoice_import_unsupported() {
        assert!(matches!(
            preview_invoices("x".as_bytes()),
            Err(Error::Unsupported(_))
        ));
    }
}
