use serde::{Deserialize, Serialize};

/// Column offsets for the complete/single-source layout.
///
/// Default positions match the standard branch export: identifier, name,
/// counted quantity, system quantity, unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub identifier: usize,
    pub name: usize,
    pub counted: usize,
    pub system: usize,
    pub cost: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            identifier: 0,
            name: 1,
            counted: 2,
            system: 3,
            cost: 4,
        }
    }
}

impl ColumnMap {
    /// First column whose offset a row of `len` cells cannot reach.
    pub fn first_missing(&self, len: usize) -> Option<&'static str> {
        [
            (self.identifier, "identifier"),
            (self.name, "name"),
            (self.counted, "counted"),
            (self.system, "system"),
            (self.cost, "cost"),
        ]
        .into_iter()
        .find(|&(idx, _)| idx >= len)
        .map(|(_, column)| column)
    }
}

/// Column offsets for the partial (subset-team) layout: identifier + counted
/// quantity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialColumnMap {
    pub identifier: usize,
    pub qty: usize,
}

impl Default for PartialColumnMap {
    fn default() -> Self {
        Self {
            identifier: 0,
            qty: 1,
        }
    }
}

impl PartialColumnMap {
    pub fn first_missing(&self, len: usize) -> Option<&'static str> {
        [(self.identifier, "identifier"), (self.qty, "quantity")]
            .into_iter()
            .find(|&(idx, _)| idx >= len)
            .map(|(_, column)| column)
    }
}

const IDENTIFIER_KEYWORDS: &[&str] = &["ean", "codigo", "código", "barcode", "code"];
const NAME_KEYWORDS: &[&str] = &["desc", "nome", "name", "produto", "product"];
const COUNTED_KEYWORDS: &[&str] = &["cont", "fisico", "físico", "counted"];
const SYSTEM_KEYWORDS: &[&str] = &["sist", "system", "estoque", "stock"];
const COST_KEYWORDS: &[&str] = &["custo", "cost", "preco", "preço", "price"];
const QTY_KEYWORDS: &[&str] = &["qtd", "qty", "quant"];

fn find(header: &[String], keywords: &[&str]) -> Option<usize> {
    header.iter().position(|cell| {
        let cell = cell.trim().to_lowercase();
        keywords.iter().any(|k| cell.contains(k))
    })
}

/// Detect the complete-layout columns from a header row.
///
/// All five columns must be recognizable for detection to win; otherwise the
/// caller falls back to [`ColumnMap::default`]. A `Some` result also means
/// the header row itself must be skipped when parsing data.
pub fn detect_complete_columns(header: &[String]) -> Option<ColumnMap> {
    let map = ColumnMap {
        identifier: find(header, IDENTIFIER_KEYWORDS)?,
        name: find(header, NAME_KEYWORDS)?,
        counted: find(header, COUNTED_KEYWORDS)?,
        system: find(header, SYSTEM_KEYWORDS)?,
        cost: find(header, COST_KEYWORDS)?,
    };
    tracing::debug!(?map, "detected columns from header row");
    Some(map)
}

/// Detect the partial-layout columns from a header row.
pub fn detect_partial_columns(header: &[String]) -> Option<PartialColumnMap> {
    Some(PartialColumnMap {
        identifier: find(header, IDENTIFIER_KEYWORDS)?,
        qty: find(header, QTY_KEYWORDS)?,
    })
}
