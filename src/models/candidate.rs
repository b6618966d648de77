use serde::{Deserialize, Deserializer, Serialize};

use super::SearchQuery;

const UNKNOWN_SERVICE: &str = "Desconhecido";

/// Service detected on a drawing page by the extraction step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCandidate {
    #[serde(rename = "servico_original", alias = "original_text", default = "unknown_service")]
    pub original_text: String,
    #[serde(rename = "termo_principal", alias = "primary_term", default)]
    pub primary_term: Option<String>,
    #[serde(rename = "termos_alternativos", alias = "alternative_terms", default)]
    pub alternative_terms: Vec<String>,
    #[serde(
        rename = "quantidade",
        alias = "quantity",
        default,
        deserialize_with = "lenient_quantity"
    )]
    pub quantity: Option<f64>,
    #[serde(rename = "unidade", alias = "unit", default)]
    pub unit: Option<String>,
    #[serde(rename = "observacao", alias = "note", default)]
    pub note: Option<String>,
}

impl ServiceCandidate {
    /// Primary term, or the original text when none was suggested
    pub fn primary_term(&self) -> &str {
        match self.primary_term.as_deref() {
            Some(term) if !term.trim().is_empty() => term,
            _ => &self.original_text,
        }
    }

    /// Estimated quantity, 1.0 when missing or unusable
    pub fn quantity(&self) -> f64 {
        match self.quantity {
            Some(q) if q.is_finite() && q >= 0.0 => q,
            _ => 1.0,
        }
    }

    pub fn search_query(&self) -> SearchQuery {
        SearchQuery::new(self.primary_term(), self.alternative_terms.clone())
    }
}

fn unknown_service() -> String {
    UNKNOWN_SERVICE.to_string()
}

/// Accepts `12.5`, `"12,5"`, `"12.5"` or `null`
fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().replace(',', ".").parse().ok(),
        None => None,
    })
}
