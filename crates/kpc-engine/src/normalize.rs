//! Offer validation and unit-price normalization.
//!
//! The backend is the single source of truth for unit prices. Local
//! derivation exists only behind [`UnitPricePolicy::DeriveMissing`].

use kpc_core::{Offer, PriceOut, Product};

/// How the effective unit price of an offer is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnitPricePolicy {
    /// Use the upstream `unit_price` only; anything else is unknown.
    #[default]
    Upstream,
    /// Use the upstream value when usable, otherwise derive it from the
    /// shelf price and the product's pack size.
    DeriveMissing,
}

/// Effective unit price of `offer` under the upstream policy.
///
/// Returns the upstream `unit_price` unchanged when it is finite and
/// non-negative, `None` otherwise.
#[must_use]
pub fn normalize(offer: &Offer, product: &Product) -> Option<f64> {
    normalize_with(offer, product, UnitPricePolicy::Upstream)
}

/// Effective unit price of `offer` under an explicit policy.
#[must_use]
pub fn normalize_with(offer: &Offer, product: &Product, policy: UnitPricePolicy) -> Option<f64> {
    offer.usable_unit_price().or_else(|| match policy {
        UnitPricePolicy::Upstream => None,
        UnitPricePolicy::DeriveMissing => derive_unit_price(offer, product),
    })
}

/// Price per kg (unit `g`) or per L (unit `ml`):
/// `price / (size_ml_g / 1000)`, rounded to cents.
///
/// Needs a usable shelf price and a positive pack size.
#[must_use]
pub fn derive_unit_price(offer: &Offer, product: &Product) -> Option<f64> {
    let price = offer.usable_price()?;
    let size = product.size_ml_g.filter(|s| *s > 0)?;

    #[allow(clippy::cast_precision_loss)]
    let per_base = size as f64 / 1000.0;
    let unit_price = (price / per_base * 100.0).round() / 100.0;
    unit_price.is_finite().then_some(unit_price)
}

/// Converts wire records into offers, dropping records that cannot take
/// part in a ranking.
#[must_use]
pub fn validate_offers(product: &Product, raw: Vec<PriceOut>) -> Vec<Offer> {
    raw.into_iter()
        .filter_map(|record| match Offer::try_from(record) {
            Ok(offer) => Some(offer),
            Err(e) => {
                tracing::debug!(
                    product_id = product.id,
                    error = %e,
                    "dropping offer record"
                );
                None
            }
        })
        .collect()
}
