//! Price offer aggregation and ranking.
//!
//! Pure pieces ([`normalize`], [`rank`], [`cheapest`], [`FallbackProvider`])
//! never suspend; [`summarize`] and [`compare`] drive an injected
//! [`OfferSource`] and are the only async entry points.

pub mod error;
pub mod fallback;
pub mod normalize;
pub mod rank;
pub mod summarize;

pub use error::EngineError;
pub use fallback::{FallbackProvider, NoFallback, StaticFallback};
pub use normalize::{derive_unit_price, normalize, normalize_with, validate_offers, UnitPricePolicy};
pub use rank::{cheapest, cheapest_with, rank, rank_with, RankedOffer};
pub use summarize::{
    compare, offer_source_fn, resolve_comparison, summarize, ComparedOffer, Comparison,
    FetchOutcome, FnSource, OfferOrigin, OfferSource, Quote, Ranking, Summary, SummarizeOptions,
    SummaryEntry,
};
