//! Offer records as sent by the price backend and as used by the engine.
//!
//! ## Observed wire shape (`PriceOut`)
//!
//! ### `price_eur` / `unit_price`
//! Numbers in practice, but the scrapers feeding the backend have produced
//! `null`, missing keys and the occasional string (`"1,29"`). Absence means
//! "unusable price", never zero, so both fields are `Option<f64>` and any
//! value that is not a number or numeric string is read as `None`.
//!
//! ### `store`
//! Required by the backend schema, but treated as optional on the wire so a
//! single bad record cannot fail the whole `compare` response. Records
//! without a store are rejected when converting into [`Offer`].
//!
//! ### `collected_at`
//! Pydantic `datetime` serialization: either RFC 3339 with offset or a naive
//! `2025-09-30T08:15:00` that is UTC by convention.
//!
//! ### `promo_valid_from` / `promo_valid_to`
//! Advisory only. Passed through as received.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A single offer as returned by `GET compare` (wire name `PriceOut`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceOut {
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub raw_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price_eur: Option<f64>,
    /// Price per kg or per L, computed by the backend when the pack size is known.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub collected_at: Option<String>,
    #[serde(default)]
    pub promo: Option<bool>,
    #[serde(default)]
    pub promo_valid_from: Option<String>,
    #[serde(default)]
    pub promo_valid_to: Option<String>,
}

/// One store's advertised price for a product at a point in time.
///
/// Offers are never mutated after construction; a refetch replaces the
/// whole set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    /// Store display name, e.g. `"Viva Fresh"`.
    pub store: String,
    /// Product name as advertised by the store.
    pub raw_name: String,
    pub url: Option<String>,
    /// Shelf price. `None` when the record carried no usable amount.
    pub price: Option<f64>,
    /// Upstream-computed price per kg or per L.
    pub unit_price: Option<f64>,
    pub currency: Option<String>,
    pub collected_at: Option<String>,
    pub promo: bool,
    pub promo_valid_from: Option<String>,
    pub promo_valid_to: Option<String>,
}

/// A wire record that cannot take part in a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed offer: {reason}")]
pub struct MalformedOffer {
    pub reason: String,
}

impl TryFrom<PriceOut> for Offer {
    type Error = MalformedOffer;

    fn try_from(raw: PriceOut) -> Result<Self, Self::Error> {
        let store = raw
            .store
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MalformedOffer {
                reason: "missing store".to_owned(),
            })?;

        Ok(Self {
            store,
            raw_name: raw.raw_name.unwrap_or_default(),
            url: raw.url.filter(|u| !u.trim().is_empty()),
            price: raw.price_eur,
            unit_price: raw.unit_price,
            currency: raw.currency,
            collected_at: raw.collected_at,
            promo: raw.promo.unwrap_or(false),
            promo_valid_from: raw.promo_valid_from,
            promo_valid_to: raw.promo_valid_to,
        })
    }
}

impl Offer {
    /// Builds a hand-curated seed offer: non-promotional, no timestamp.
    #[must_use]
    pub fn seed(store: &str, price: f64, unit_price: Option<f64>, currency: &str) -> Self {
        Self {
            store: store.to_owned(),
            raw_name: String::new(),
            url: None,
            price: Some(price),
            unit_price,
            currency: Some(currency.to_owned()),
            collected_at: None,
            promo: false,
            promo_valid_from: None,
            promo_valid_to: None,
        }
    }

    /// Shelf price when it is finite and non-negative.
    #[must_use]
    pub fn usable_price(&self) -> Option<f64> {
        is_usable_amount(self.price)
    }

    /// Upstream unit price when it is finite and non-negative.
    #[must_use]
    pub fn usable_unit_price(&self) -> Option<f64> {
        is_usable_amount(self.unit_price)
    }

    /// Parses `collected_at` into a UTC timestamp.
    ///
    /// Accepts RFC 3339 and naive ISO timestamps (read as UTC). Returns
    /// `None` when the field is absent or unparseable.
    #[must_use]
    pub fn collected_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.collected_at.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

/// Returns the amount only if it is present, finite and non-negative.
#[must_use]
pub fn is_usable_amount(amount: Option<f64>) -> Option<f64> {
    amount.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Reads a JSON number or numeric string; anything else becomes `None`.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawAmount>::deserialize(deserializer)? {
        Some(RawAmount::Number(v)) => Some(v),
        Some(RawAmount::Text(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        Some(RawAmount::Other(_)) | None => None,
    })
}

#[cfg(test)]
#[path = "offers_test.rs"]
mod tests;
