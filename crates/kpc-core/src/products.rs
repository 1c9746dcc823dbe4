use serde::{Deserialize, Serialize};

use crate::offers::PriceOut;

/// Base measurement kind of a [`Product`].
///
/// Only base units travel on the wire; kilograms and litres are derived
/// when a unit price is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    G,
    Ml,
}

impl UnitKind {
    /// Label of the normalized unit a unit price refers to (`"kg"` or `"L"`).
    #[must_use]
    pub fn per_unit_label(self) -> &'static str {
        match self {
            UnitKind::G => "kg",
            UnitKind::Ml => "L",
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::G => write!(f, "g"),
            UnitKind::Ml => write!(f, "ml"),
        }
    }
}

/// A canonical grocery product, e.g. `"Milk 1L 2.8%"`.
///
/// Owned by the data source; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Stable display key. Also the lookup key for fallback offers.
    pub canonical_name: String,
    pub category: String,
    pub unit: UnitKind,
    #[serde(default)]
    pub brand: Option<String>,
    /// Pack size in base units matching `unit` (`1000` for a 1 L carton).
    #[serde(default)]
    pub size_ml_g: Option<i64>,
    /// Fat percentage as a decimal, `2.8` for "2.8%".
    #[serde(default)]
    pub fat_pct: Option<f64>,
}

/// Response body of `GET compare?product_id=<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareOut {
    pub product: Product,
    #[serde(default)]
    pub offers: Vec<PriceOut>,
}
