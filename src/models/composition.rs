use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::Serialize;

/// Priced composition line from the reference cost sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionRecord {
    pub description: String,
    pub unit: String,
    pub unit_cost: BigDecimal,
    /// Upper-cased description, the only text the matcher looks at
    #[serde(skip)]
    search_key: String,
}

impl CompositionRecord {
    pub fn new(description: impl Into<String>, unit: impl Into<String>, unit_cost: BigDecimal) -> Self {
        let description = description.into();
        let search_key = description.to_uppercase();
        Self {
            description,
            unit: unit.into(),
            unit_cost,
            search_key,
        }
    }

    /// True when every token is a literal substring of the upper-cased description.
    /// Tokens are expected to be upper-cased already.
    pub fn contains_all(&self, tokens: &[String]) -> bool {
        tokens.iter().all(|t| self.search_key.contains(t.as_str()))
    }
}

/// Immutable, ordered set of compositions keyed by description.
///
/// Records keep the order they were loaded in; a repeated description keeps
/// its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: IndexMap<String, CompositionRecord>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a dataset, dropping blank descriptions and later duplicates.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CompositionRecord>,
    {
        let mut map: IndexMap<String, CompositionRecord> = IndexMap::new();
        for record in records {
            if record.description.trim().is_empty() {
                continue;
            }
            map.entry(record.description.clone()).or_insert(record);
        }
        Self { records: map }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, description: &str) -> Option<&CompositionRecord> {
        self.records.get(description)
    }

    pub fn records(&self) -> impl Iterator<Item = &CompositionRecord> {
        self.records.values()
    }

    /// Records matching all tokens, lazily, in load order.
    ///
    /// This is a linear scan; an inverted index could back it later without
    /// touching callers.
    pub fn scan<'a>(&'a self, tokens: &'a [String]) -> impl Iterator<Item = &'a CompositionRecord> + 'a {
        self.records.values().filter(move |r| r.contains_all(tokens))
    }
}
