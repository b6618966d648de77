use std::io::Write;
use std::path::Path;

use crate::models::{decimal_comma, BudgetLedger};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const HEADER: [&str; 7] = [
    "PÁGINA",
    "SERVIÇO ORIGINAL",
    "COMPOSIÇÃO SINAPI",
    "QTD",
    "UND",
    "CUSTO UNIT.",
    "TOTAL",
];

/// Writes the ledger spreadsheet-style: BOM, `;` separator, decimal comma
pub fn write_budget_csv<W: Write>(ledger: &BudgetLedger, mut out: W) -> Result<(), csv::Error> {
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(out);

    writer.write_record(HEADER)?;
    for line in ledger.lines() {
        writer.write_record([
            line.page.map(|p| p.to_string()).unwrap_or_default(),
            line.original_service_text.clone(),
            line.matched_description.clone(),
            decimal_comma(&line.quantity),
            line.unit.clone(),
            decimal_comma(&line.unit_cost),
            decimal_comma(&line.total),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// In-memory export, for downloads
pub fn budget_csv_bytes(ledger: &BudgetLedger) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_budget_csv(ledger, &mut buf)?;
    Ok(buf)
}

/// Export to a file on disk
pub fn export_to_csv(ledger: &BudgetLedger, output_path: &Path) -> Result<(), csv::Error> {
    let file = std::fs::File::create(output_path)?;
    write_budget_csv(ledger, std::io::BufWriter::new(file))?;
    tracing::info!("Budget exported: {} lines -> {}", ledger.len(), output_path.display());
    Ok(())
}
