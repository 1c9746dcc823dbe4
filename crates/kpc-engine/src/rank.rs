//! Ordering and selection of offers for a single product.
//!
//! Offers are ordered ascending by effective unit price, then by shelf
//! price. An unknown value in either key sorts as `+∞`, so a store that
//! discloses nothing can never look cheapest by omission. Equal keys keep
//! input order.

use std::cmp::Ordering;

use kpc_core::{Offer, Product};

use crate::normalize::{normalize_with, UnitPricePolicy};

/// Read-only view of an [`Offer`] with its resolved unit price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedOffer<'a> {
    pub offer: &'a Offer,
    /// Unit price used for ordering; `None` when unknown.
    pub unit_price_effective: Option<f64>,
}

impl RankedOffer<'_> {
    /// `true` when either ranking key carries a usable value.
    #[must_use]
    pub fn has_usable_price(&self) -> bool {
        self.unit_price_effective.is_some() || self.offer.usable_price().is_some()
    }

    fn sort_key(&self) -> (f64, f64) {
        (
            self.unit_price_effective.unwrap_or(f64::INFINITY),
            self.offer.usable_price().unwrap_or(f64::INFINITY),
        )
    }
}

fn compare_ranked(a: &RankedOffer<'_>, b: &RankedOffer<'_>) -> Ordering {
    let (a_unit, a_price) = a.sort_key();
    let (b_unit, b_price) = b.sort_key();
    // Keys are finite or +∞, never NaN.
    a_unit
        .partial_cmp(&b_unit)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_price.partial_cmp(&b_price).unwrap_or(Ordering::Equal))
}

fn rank_by<'a, F>(offers: &'a [Offer], unit_price_of: F) -> Vec<RankedOffer<'a>>
where
    F: Fn(&Offer) -> Option<f64>,
{
    let mut ranked: Vec<RankedOffer<'a>> = offers
        .iter()
        .map(|offer| RankedOffer {
            offer,
            unit_price_effective: unit_price_of(offer),
        })
        .collect();
    // `sort_by` is stable: ties keep input order.
    ranked.sort_by(compare_ranked);
    ranked
}

fn cheapest_by<F>(offers: &[Offer], unit_price_of: F) -> Option<&Offer>
where
    F: Fn(&Offer) -> Option<f64>,
{
    let mut best: Option<RankedOffer<'_>> = None;
    for offer in offers {
        let candidate = RankedOffer {
            offer,
            unit_price_effective: unit_price_of(offer),
        };
        if !candidate.has_usable_price() {
            continue;
        }
        // Strictly-less replaces, so the first of equal offers wins.
        if best
            .as_ref()
            .is_none_or(|current| compare_ranked(&candidate, current) == Ordering::Less)
        {
            best = Some(candidate);
        }
    }
    best.map(|b| b.offer)
}

/// Orders offers of one product using upstream unit prices.
///
/// Total: the empty list ranks to the empty list, and offers missing both
/// keys keep their relative input order at the end.
#[must_use]
pub fn rank(offers: &[Offer]) -> Vec<RankedOffer<'_>> {
    rank_by(offers, Offer::usable_unit_price)
}

/// Orders offers of `product` with an explicit unit-price policy.
#[must_use]
pub fn rank_with<'a>(
    offers: &'a [Offer],
    product: &Product,
    policy: UnitPricePolicy,
) -> Vec<RankedOffer<'a>> {
    rank_by(offers, |offer| normalize_with(offer, product, policy))
}

/// The first offer [`rank`] would place, provided it has a usable price.
///
/// Single linear scan. Returns `None` for an empty list or when no offer
/// carries a usable unit price or shelf price.
#[must_use]
pub fn cheapest(offers: &[Offer]) -> Option<&Offer> {
    cheapest_by(offers, Offer::usable_unit_price)
}

/// [`cheapest`] with an explicit unit-price policy.
#[must_use]
pub fn cheapest_with<'a>(
    offers: &'a [Offer],
    product: &Product,
    policy: UnitPricePolicy,
) -> Option<&'a Offer> {
    cheapest_by(offers, |offer| normalize_with(offer, product, policy))
}

#[cfg(test)]
#[path = "rank_test.rs"]
mod tests;
