use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::MatchCandidate;

/// One priced row of the budget table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub page: Option<u32>,
    pub original_service_text: String,
    pub matched_description: String,
    pub quantity: BigDecimal,
    pub unit: String,
    pub unit_cost: BigDecimal,
    pub total: BigDecimal,
    pub added_at: DateTime<Utc>,
}

impl BudgetLine {
    pub fn new(
        page: Option<u32>,
        original_service_text: impl Into<String>,
        candidate: &MatchCandidate,
        quantity: BigDecimal,
    ) -> Self {
        let total = &quantity * &candidate.unit_cost;
        Self {
            page,
            original_service_text: original_service_text.into(),
            matched_description: candidate.description.clone(),
            quantity,
            unit: candidate.unit.clone(),
            unit_cost: candidate.unit_cost.clone(),
            total,
            added_at: Utc::now(),
        }
    }
}

/// Append-only list of accepted lines (removal is by explicit index only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetLedger {
    lines: Vec<BudgetLine>,
}

impl BudgetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: BudgetLine) {
        self.lines.push(line);
    }

    pub fn remove(&mut self, index: usize) -> Option<BudgetLine> {
        if index < self.lines.len() {
            Some(self.lines.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[BudgetLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> BigDecimal {
        self.lines
            .iter()
            .fold(BigDecimal::zero(), |acc, line| acc + &line.total)
    }
}

/// Converts a float coming from JSON into an exact decimal via its shortest text form
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// Two places, decimal comma, no grouping: `1234,50`
pub fn decimal_comma(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string().replace('.', ",")
}

/// Currency display: `R$ 1.234,50`
pub fn format_brl(value: &BigDecimal) -> String {
    let plain = value.round(2).with_scale(2).to_string();
    let (sign, digits) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(cost: &str) -> MatchCandidate {
        MatchCandidate {
            description: "REMOÇÃO DE PISO CERÂMICO".into(),
            unit: "m2".into(),
            unit_cost: BigDecimal::from_str(cost).unwrap(),
        }
    }

    #[test]
    fn line_total_is_quantity_times_cost() {
        let line = BudgetLine::new(Some(3), "Demolir piso", &candidate("12.50"), BigDecimal::from(4));
        assert_eq!(line.total, BigDecimal::from(50));
        assert_eq!(line.unit, "m2");
    }

    #[test]
    fn line_is_stamped_when_accepted() {
        let before = Utc::now();
        let line = BudgetLine::new(None, "Pintar parede", &candidate("18.20"), BigDecimal::from(1));
        let after = Utc::now();
        assert!(line.added_at >= before && line.added_at <= after);

        let json = serde_json::to_value(&line).unwrap();
        let stamp: DateTime<Utc> = serde_json::from_value(json["added_at"].clone()).unwrap();
        assert_eq!(stamp, line.added_at);
    }

    #[test]
    fn ledger_total_and_remove() {
        let mut ledger = BudgetLedger::new();
        ledger.push(BudgetLine::new(None, "a", &candidate("10.00"), BigDecimal::from(2)));
        ledger.push(BudgetLine::new(None, "b", &candidate("0.25"), BigDecimal::from(3)));
        assert_eq!(ledger.total(), BigDecimal::from_str("20.75").unwrap());
        assert!(ledger.remove(5).is_none());
        assert_eq!(ledger.remove(0).unwrap().original_service_text, "a");
        assert_eq!(ledger.len(), 1);
        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn brazilian_formatting() {
        let v = BigDecimal::from_str("1234567.891").unwrap();
        assert_eq!(format_brl(&v), "R$ 1.234.567,89");
        assert_eq!(decimal_comma(&v), "1234567,89");
        assert_eq!(format_brl(&BigDecimal::from_str("12.5").unwrap()), "R$ 12,50");
        assert_eq!(format_brl(&BigDecimal::zero()), "R$ 0,00");
    }

    #[test]
    fn float_conversion_is_exact_text() {
        assert_eq!(decimal_from_f64(12.5), Some(BigDecimal::from_str("12.5").unwrap()));
        assert_eq!(decimal_from_f64(f64::NAN), None);
    }
}
