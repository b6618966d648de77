use bigdecimal::{BigDecimal, Zero};
use std::str::FromStr;

use super::source::{Cell, RawTable};
use super::LoadError;
use crate::models::{CompositionRecord, Dataset};

const DEFAULT_UNIT: &str = "UN";

/// Column positions located by name fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub description: usize,
    pub unit: Option<usize>,
    pub cost: Option<usize>,
}

impl ColumnLayout {
    pub fn locate(headers: &[String]) -> Result<Self, LoadError> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let find = |fragments: &[&str]| {
            normalized
                .iter()
                .position(|name| fragments.iter().all(|f| name.contains(f)))
        };

        let description = find(&["DESCRICAO", "COMPOSICAO"])
            .ok_or_else(|| LoadError::MissingColumn("DESCRICAO DA COMPOSICAO".to_string()))?;

        Ok(Self {
            description,
            unit: find(&["UNIDADE"]),
            cost: find(&["CUSTO", "TOTAL"]),
        })
    }
}

/// Trim, upper-case and drop Portuguese accents so `Descrição` finds `DESCRICAO`
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Parses `1.234,56` style text: dots are thousands separators, comma is the decimal mark.
/// Negative or unreadable values yield `None`.
pub fn parse_cost_text(raw: &str) -> Option<BigDecimal> {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    let value = BigDecimal::from_str(&cleaned).ok()?;
    (value >= BigDecimal::zero()).then_some(value)
}

/// Cost of a cell; anything unusable counts as zero
pub fn parse_cost(cell: &Cell) -> BigDecimal {
    let parsed = match cell {
        Cell::Empty => None,
        Cell::Text(s) => parse_cost_text(s),
        Cell::Number(n) if n.is_finite() && *n >= 0.0 => BigDecimal::from_str(&n.to_string()).ok(),
        Cell::Number(_) => None,
    };
    parsed.unwrap_or_else(BigDecimal::zero)
}

/// Turns a raw table into a deduplicated dataset
pub fn build_dataset(table: &RawTable) -> Result<Dataset, LoadError> {
    let layout = ColumnLayout::locate(&table.headers)?;
    if layout.cost.is_none() {
        tracing::warn!("No CUSTO TOTAL column found, every cost will be 0");
    }

    let cell = |row: &[Cell], idx: Option<usize>| -> Cell {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or(Cell::Empty)
    };

    let mut blank = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let row = row.as_slice();
        let Some(description) = cell(row, Some(layout.description)).as_text() else {
            blank += 1;
            continue;
        };
        let unit = cell(row, layout.unit)
            .as_text()
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());
        let cost = parse_cost(&cell(row, layout.cost));
        records.push(CompositionRecord::new(description, unit, cost));
    }

    let parsed = records.len();
    let dataset = Dataset::from_records(records);
    tracing::info!(
        "Dataset built: {} compositions ({} rows without description, {} duplicates dropped)",
        dataset.len(),
        blank,
        parsed - dataset.len()
    );

    Ok(dataset)
}
