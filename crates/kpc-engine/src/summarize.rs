//! Aggregation across products: fetch, validate, select, fall back.
//!
//! Fetches are the only suspension points. Everything after a fetch settles
//! is synchronous, and results are slotted by input position so the output
//! never depends on arrival order.

use std::fmt::Display;
use std::future::Future;

use futures::stream::{self, StreamExt};
use kpc_core::{AppConfig, Offer, PriceOut, Product};
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::fallback::FallbackProvider;
use crate::normalize::{validate_offers, UnitPricePolicy};
use crate::rank::{cheapest_with, rank_with};

/// Where offer records for a product come from.
pub trait OfferSource {
    type Error: Display;

    /// Raw offer records for `product`. An empty list is a valid answer.
    fn fetch(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<Vec<PriceOut>, Self::Error>> + Send;
}

/// Adapts a closure keyed by product id into an [`OfferSource`].
pub struct FnSource<F>(F);

/// Wraps `f` so it can be passed wherever an [`OfferSource`] is expected.
pub fn offer_source_fn<F, Fut, E>(f: F) -> FnSource<F>
where
    F: Fn(i64) -> Fut,
    Fut: Future<Output = Result<Vec<PriceOut>, E>> + Send,
    E: Display,
{
    FnSource(f)
}

impl<F, Fut, E> OfferSource for FnSource<F>
where
    F: Fn(i64) -> Fut,
    Fut: Future<Output = Result<Vec<PriceOut>, E>> + Send,
    E: Display,
{
    type Error = E;

    fn fetch(&self, product: &Product) -> impl Future<Output = Result<Vec<PriceOut>, E>> + Send {
        (self.0)(product.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizeOptions {
    /// Upper bound on fetches in flight at once. Values below 1 act as 1.
    pub max_concurrent: usize,
    pub unit_price_policy: UnitPricePolicy,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            unit_price_policy: UnitPricePolicy::Upstream,
        }
    }
}

impl From<&AppConfig> for SummarizeOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_fetches,
            unit_price_policy: if config.derive_unit_price {
                UnitPricePolicy::DeriveMissing
            } else {
                UnitPricePolicy::Upstream
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOrigin {
    Live,
    Fallback,
}

/// What the live source returned for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Non-empty response with this many raw records.
    Offers(usize),
    Empty,
    /// The fetch failed; carries the rendered error.
    Failed(String),
}

impl FetchOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// The winning offer for one product, tagged with its origin.
#[derive(Debug, Clone, PartialEq)]
pub enum Quote {
    Live(Offer),
    Fallback(Offer),
    NoOffers,
}

impl Quote {
    #[must_use]
    pub fn offer(&self) -> Option<&Offer> {
        match self {
            Self::Live(offer) | Self::Fallback(offer) => Some(offer),
            Self::NoOffers => None,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Option<OfferOrigin> {
        match self {
            Self::Live(_) => Some(OfferOrigin::Live),
            Self::Fallback(_) => Some(OfferOrigin::Fallback),
            Self::NoOffers => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub product: Product,
    pub quote: Quote,
    pub fetch: FetchOutcome,
}

impl SummaryEntry {
    #[must_use]
    pub fn offer(&self) -> Option<&Offer> {
        self.quote.offer()
    }

    #[must_use]
    pub fn used_fallback(&self) -> bool {
        matches!(self.quote, Quote::Fallback(_))
    }
}

/// Per-product cheapest offers, in input product order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    entries: Vec<SummaryEntry>,
}

impl Summary {
    /// First entry for `product_id`.
    #[must_use]
    pub fn get(&self, product_id: i64) -> Option<&SummaryEntry> {
        self.entries.iter().find(|e| e.product.id == product_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SummaryEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.entries.iter().filter(|e| e.used_fallback()).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.fetch.is_failed()).count()
    }

    #[must_use]
    pub fn no_offer_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.quote == Quote::NoOffers)
            .count()
    }

    /// `true` when the summary is non-empty, every fetch failed and no
    /// product was rescued by fallback data.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.entries.is_empty()
            && self
                .entries
                .iter()
                .all(|e| e.fetch.is_failed() && e.offer().is_none())
    }
}

impl<'a> IntoIterator for &'a Summary {
    type Item = &'a SummaryEntry;
    type IntoIter = std::slice::Iter<'a, SummaryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// An offer placed in a comparison, with the unit price used to order it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparedOffer {
    pub offer: Offer,
    pub unit_price_effective: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ranking {
    Live(Vec<ComparedOffer>),
    Fallback(Vec<ComparedOffer>),
    NoOffers,
}

/// Detail view of one product: every offer, cheapest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub product: Product,
    pub ranking: Ranking,
    pub fetch: FetchOutcome,
}

impl Comparison {
    #[must_use]
    pub fn offers(&self) -> &[ComparedOffer] {
        match &self.ranking {
            Ranking::Live(offers) | Ranking::Fallback(offers) => offers,
            Ranking::NoOffers => &[],
        }
    }

    #[must_use]
    pub fn origin(&self) -> Option<OfferOrigin> {
        match self.ranking {
            Ranking::Live(_) => Some(OfferOrigin::Live),
            Ranking::Fallback(_) => Some(OfferOrigin::Fallback),
            Ranking::NoOffers => None,
        }
    }
}

/// Turns a settled fetch into validated offers plus its outcome.
fn settle<E: Display>(
    product: &Product,
    fetched: Result<Vec<PriceOut>, E>,
) -> (Vec<Offer>, FetchOutcome) {
    match fetched {
        Ok(raw) if raw.is_empty() => (Vec::new(), FetchOutcome::Empty),
        Ok(raw) => {
            let count = raw.len();
            (validate_offers(product, raw), FetchOutcome::Offers(count))
        }
        Err(e) => {
            tracing::warn!(
                product_id = product.id,
                error = %e,
                "offer fetch failed"
            );
            (Vec::new(), FetchOutcome::Failed(e.to_string()))
        }
    }
}

fn resolve_entry<E, F>(
    product: &Product,
    fetched: Result<Vec<PriceOut>, E>,
    fallback: &F,
    policy: UnitPricePolicy,
) -> SummaryEntry
where
    E: Display,
    F: FallbackProvider + ?Sized,
{
    let (offers, fetch) = settle(product, fetched);

    let quote = if let Some(best) = cheapest_with(&offers, product, policy) {
        Quote::Live(best.clone())
    } else {
        let seeds = fallback.fallback(product);
        match cheapest_with(&seeds, product, policy) {
            Some(best) => {
                tracing::info!(
                    product_id = product.id,
                    canonical_name = %product.canonical_name,
                    "no usable live offers; using fallback"
                );
                Quote::Fallback(best.clone())
            }
            None => Quote::NoOffers,
        }
    };

    SummaryEntry {
        product: product.clone(),
        quote,
        fetch,
    }
}

fn compared(offers: &[Offer], product: &Product, policy: UnitPricePolicy) -> Vec<ComparedOffer> {
    rank_with(offers, product, policy)
        .into_iter()
        .map(|ranked| ComparedOffer {
            offer: ranked.offer.clone(),
            unit_price_effective: ranked.unit_price_effective,
        })
        .collect()
}

/// Builds the detail view from an already settled fetch.
///
/// Every valid live offer is listed, including ones without a usable price
/// (ranked last). The fallback list is ranked instead only when no valid
/// live offer remains.
pub fn resolve_comparison<E, F>(
    product: &Product,
    fetched: Result<Vec<PriceOut>, E>,
    fallback: &F,
    policy: UnitPricePolicy,
) -> Comparison
where
    E: Display,
    F: FallbackProvider + ?Sized,
{
    let (offers, fetch) = settle(product, fetched);

    let ranking = if !offers.is_empty() {
        Ranking::Live(compared(&offers, product, policy))
    } else {
        let seeds = fallback.fallback(product);
        if seeds.is_empty() {
            Ranking::NoOffers
        } else {
            tracing::info!(
                product_id = product.id,
                canonical_name = %product.canonical_name,
                "no usable live offers; comparing fallback offers"
            );
            Ranking::Fallback(compared(&seeds, product, policy))
        }
    };

    Comparison {
        product: product.clone(),
        ranking,
        fetch,
    }
}

/// Runs one fetch unless `cancel` fires first. `None` means cancelled.
async fn fetch_guarded<S: OfferSource>(
    source: &S,
    product: &Product,
    cancel: &CancellationToken,
) -> Option<Result<Vec<PriceOut>, S::Error>> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        result = source.fetch(product) => Some(result),
    }
}

/// Cheapest offer per product, with fallback for products the live source
/// has nothing usable for.
///
/// A failing product never affects the others. Every input product gets an
/// entry, in input order.
///
/// # Errors
///
/// Returns [`EngineError::Cancelled`] when `cancel` fires before every
/// fetch has settled. No partial summary is returned.
pub async fn summarize<S, F>(
    products: &[Product],
    source: &S,
    fallback: &F,
    options: &SummarizeOptions,
    cancel: &CancellationToken,
) -> Result<Summary, EngineError>
where
    S: OfferSource,
    F: FallbackProvider + ?Sized,
{
    let total = products.len();
    let max_concurrent = options.max_concurrent.max(1);

    let mut results: Vec<(usize, Option<Result<Vec<PriceOut>, S::Error>>)> =
        stream::iter(products.iter().enumerate())
            .map(|(idx, product)| {
                let fut = fetch_guarded(source, product, cancel);
                async move { (idx, fut.await) }
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

    let settled = results.iter().filter(|(_, r)| r.is_some()).count();
    if cancel.is_cancelled() {
        tracing::info!(settled, total, "aggregation cancelled");
        return Err(EngineError::Cancelled { settled, total });
    }

    results.sort_by_key(|(idx, _)| *idx);

    let mut entries = Vec::with_capacity(total);
    for (product, (_, outcome)) in products.iter().zip(results) {
        let Some(fetched) = outcome else {
            return Err(EngineError::Cancelled { settled, total });
        };
        entries.push(resolve_entry(
            product,
            fetched,
            fallback,
            options.unit_price_policy,
        ));
    }

    let summary = Summary { entries };
    tracing::info!(
        products = total,
        fallback = summary.fallback_count(),
        failed = summary.failed_count(),
        no_offers = summary.no_offer_count(),
        "summary assembled"
    );
    Ok(summary)
}

/// Fetches and ranks every offer for one product.
///
/// # Errors
///
/// Returns [`EngineError::Cancelled`] when `cancel` fires before the fetch
/// settles.
pub async fn compare<S, F>(
    product: &Product,
    source: &S,
    fallback: &F,
    options: &SummarizeOptions,
    cancel: &CancellationToken,
) -> Result<Comparison, EngineError>
where
    S: OfferSource,
    F: FallbackProvider + ?Sized,
{
    match fetch_guarded(source, product, cancel).await {
        Some(fetched) if !cancel.is_cancelled() => Ok(resolve_comparison(
            product,
            fetched,
            fallback,
            options.unit_price_policy,
        )),
        _ => Err(EngineError::Cancelled {
            settled: 0,
            total: 1,
        }),
    }
}
