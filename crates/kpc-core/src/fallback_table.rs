use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::offers::is_usable_amount;
use crate::ConfigError;

/// One hand-curated seed offer in the fallback table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedOfferConfig {
    pub store: String,
    pub price_eur: f64,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

/// Seed offers for one product, keyed by its exact `canonical_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackProductConfig {
    pub canonical_name: String,
    pub offers: Vec<SeedOfferConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbackFile {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub products: Vec<FallbackProductConfig>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Load and validate the fallback offer table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_fallback_file(path: &Path) -> Result<FallbackFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FallbackFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_fallback_file(&content)
}

/// Parse and validate fallback table YAML that is already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the content cannot be parsed or fails validation.
pub fn parse_fallback_file(content: &str) -> Result<FallbackFile, ConfigError> {
    let file: FallbackFile = serde_yaml::from_str(content)?;
    validate_fallback_file(&file)?;
    Ok(file)
}

fn validate_fallback_file(file: &FallbackFile) -> Result<(), ConfigError> {
    if file.currency.trim().is_empty() {
        return Err(ConfigError::Validation(
            "currency must be non-empty".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();

    for product in &file.products {
        // Lookup is exact, so whitespace around a name would never match.
        if product.canonical_name.trim().is_empty()
            || product.canonical_name.trim() != product.canonical_name
        {
            return Err(ConfigError::Validation(format!(
                "canonical_name '{}' must be non-empty without surrounding whitespace",
                product.canonical_name
            )));
        }

        if !seen_names.insert(product.canonical_name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate canonical_name: '{}'",
                product.canonical_name
            )));
        }

        for offer in &product.offers {
            if offer.store.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "'{}' has a seed offer without a store",
                    product.canonical_name
                )));
            }

            if is_usable_amount(Some(offer.price_eur)).is_none() {
                return Err(ConfigError::Validation(format!(
                    "'{}' at '{}' has invalid price {}",
                    product.canonical_name, offer.store, offer.price_eur
                )));
            }

            if offer.unit_price.is_some() && is_usable_amount(offer.unit_price).is_none() {
                return Err(ConfigError::Validation(format!(
                    "'{}' at '{}' has invalid unit_price",
                    product.canonical_name, offer.store
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "fallback_table_test.rs"]
mod tests;
