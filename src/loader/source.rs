use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use super::LoadError;

/// One spreadsheet cell, reduced to what the loader cares about
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Trimmed text form, `None` for blanks
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) if n.is_finite() => Some(n.to_string()),
            Cell::Number(_) => None,
        }
    }
}

/// Header row plus the data rows below it
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Reads the first sheet (workbooks) or the whole file (delimited text).
/// `header_row` rows are skipped before the header.
pub fn read_table(path: &Path, header_row: usize, csv_delimiter: u8) -> Result<RawTable, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path, header_row),
        "csv" | "txt" => read_delimited(path, header_row, csv_delimiter),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

fn read_workbook(path: &Path, header_row: usize) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(LoadError::EmptySource);
    };
    let range = workbook.worksheet_range(first)?;

    // the range starts at the first used cell, not at A1
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let skip = header_row.saturating_sub(first_row);

    let mut rows = range.rows().skip(skip);
    let Some(header) = rows.next() else {
        return Err(LoadError::EmptySource);
    };

    Ok(RawTable {
        headers: header.iter().map(|c| convert(c).as_text().unwrap_or_default()).collect(),
        rows: rows.map(|row| row.iter().map(convert).collect()).collect(),
    })
}

fn convert(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(other.to_string()),
    }
}

fn read_delimited(path: &Path, header_row: usize, delimiter: u8) -> Result<RawTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.byte_records().skip(header_row);
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(LoadError::EmptySource),
    };

    // sheet exports are often Latin-1, decode lossily instead of failing the load
    let text = |field: &[u8]| String::from_utf8_lossy(field).into_owned();

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    let value = text(field);
                    if value.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(value)
                    }
                })
                .collect(),
        );
    }

    Ok(RawTable {
        headers: header.iter().map(text).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn delimited_source_skips_leading_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "SINAPI;;").unwrap();
        writeln!(file, "junk").unwrap();
        writeln!(file, "DESCRICAO DA COMPOSICAO;UNIDADE;CUSTO TOTAL").unwrap();
        writeln!(file, "PISO;M2;1.234,56").unwrap();
        writeln!(file, ";;").unwrap();

        let table = read_table(file.path(), 2, b';').unwrap();
        assert_eq!(table.headers, vec!["DESCRICAO DA COMPOSICAO", "UNIDADE", "CUSTO TOTAL"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], Cell::Text("1.234,56".into()));
        assert_eq!(table.rows[1][0], Cell::Empty);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let err = read_table(file.path(), 0, b';').unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == "json"));
    }

    #[test]
    fn missing_workbook_is_an_error() {
        assert!(read_table(Path::new("/nonexistent/sinapi.xlsx"), 5, b';').is_err());
    }

    fn sample_workbook() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sinapi_sample.xlsx")
    }

    #[test]
    fn workbook_header_sits_on_sixth_row() {
        // first used cell is A3, so only three rows lie above the header inside the range
        let table = read_table(&sample_workbook(), 5, b';').unwrap();
        assert_eq!(
            table.headers,
            vec!["CODIGO", "DESCRICAO DA COMPOSICAO", "UNIDADE", "CUSTO TOTAL"]
        );
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[0][0], Cell::Number(97622.0));
        assert_eq!(table.rows[0][3], Cell::Number(1045.32));
        assert_eq!(table.rows[1][3], Cell::Text("1.234,56".into()));
        assert_eq!(table.rows[3][1], Cell::Empty);
    }

    #[test]
    fn workbook_rows_become_a_deduplicated_dataset() {
        use bigdecimal::BigDecimal;
        use std::str::FromStr;

        let table = read_table(&sample_workbook(), 5, b';').unwrap();
        let dataset = crate::loader::build_dataset(&table).unwrap();
        assert_eq!(dataset.len(), 2);

        let wall = dataset.get("DEMOLIÇÃO DE ALVENARIA DE BLOCO FURADO").unwrap();
        assert_eq!(wall.unit, "M3");
        assert_eq!(wall.unit_cost, BigDecimal::from_str("1045.32").unwrap());

        // the later 9.99 duplicate is dropped
        let floor = dataset.get("REMOÇÃO DE PISO CERÂMICO").unwrap();
        assert_eq!(floor.unit_cost, BigDecimal::from_str("1234.56").unwrap());
    }

    #[test]
    fn wrong_offset_misses_the_header() {
        let table = read_table(&sample_workbook(), 3, b';').unwrap();
        assert!(crate::loader::build_dataset(&table).is_err());
    }

    #[test]
    fn calamine_cells_convert() {
        assert_eq!(convert(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(convert(&Data::Float(2.5)), Cell::Number(2.5));
        assert_eq!(convert(&Data::Empty), Cell::Empty);
        assert_eq!(convert(&Data::Bool(true)), Cell::Text("true".into()));
    }

    #[test]
    fn number_cells_render_as_text() {
        assert_eq!(Cell::Number(12.5).as_text().as_deref(), Some("12.5"));
        assert_eq!(Cell::Text("  ".into()).as_text(), None);
    }
}
