//! Plain-text tables for terminal output.

use std::fmt::Write as _;

use kpc_core::format::{collected_at, euro, product_subtitle, MISSING};
use kpc_core::Product;
use kpc_engine::{Comparison, OfferOrigin, Quote, Summary};

pub(crate) const NO_PRICE_DATA: &str = "no price data for this item";

/// Appended to rows backed by seed data rather than live prices.
const FALLBACK_MARKER: &str = "*";

const NAME_WIDTH: usize = 32;

fn subtitle(product: &Product) -> String {
    product_subtitle(product.size_ml_g, product.unit, product.fat_pct)
}

fn per_unit(amount: Option<f64>, product: &Product) -> String {
    match amount {
        Some(_) => format!("{}/{}", euro(amount), product.unit.per_unit_label()),
        None => MISSING.to_owned(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max - 3).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_owned()
    }
}

pub(crate) fn render_products(products: &[Product]) -> String {
    if products.is_empty() {
        return "no products found\n".to_owned();
    }

    let mut out = format!(
        "{:<6}{:<w$}  {:<14}CATEGORY\n",
        "ID",
        "NAME",
        "SIZE",
        w = NAME_WIDTH
    );
    for product in products {
        let _ = writeln!(
            out,
            "{:<6}{:<w$}  {:<14}{}",
            product.id,
            truncate(&product.canonical_name, NAME_WIDTH),
            subtitle(product),
            product.category,
            w = NAME_WIDTH
        );
    }
    out
}

pub(crate) fn render_comparison(comparison: &Comparison) -> String {
    let product = &comparison.product;
    let mut out = format!("{} ({})\n", product.canonical_name, subtitle(product));

    match comparison.origin() {
        None => {
            let _ = writeln!(out, "{NO_PRICE_DATA}");
            return out;
        }
        Some(OfferOrigin::Fallback) => {
            let _ = writeln!(out, "live prices unavailable; showing offline prices");
        }
        Some(OfferOrigin::Live) => {}
    }

    let _ = writeln!(
        out,
        "{:<14}{:>12}  {:>14}  {:<18}NOTE",
        "STORE", "PRICE", "UNIT PRICE", "UPDATED"
    );
    for compared in comparison.offers() {
        let offer = &compared.offer;
        let note = if offer.promo { "promo" } else { "" };
        let _ = writeln!(
            out,
            "{:<14}{:>12}  {:>14}  {:<18}{}",
            truncate(&offer.store, 14),
            euro(offer.price),
            per_unit(compared.unit_price_effective, product),
            collected_at(offer.collected_at_utc()),
            note
        );
    }
    out
}

pub(crate) fn render_summary(summary: &Summary) -> String {
    if summary.is_empty() {
        return "no products found\n".to_owned();
    }

    let mut out = format!(
        "{:<w$}  {:<14}{:>12}  {:>14}\n",
        "PRODUCT",
        "CHEAPEST",
        "PRICE",
        "UNIT PRICE",
        w = NAME_WIDTH
    );
    for entry in summary {
        let name = truncate(&entry.product.canonical_name, NAME_WIDTH);
        match &entry.quote {
            Quote::NoOffers => {
                let _ = writeln!(out, "{name:<w$}  {NO_PRICE_DATA}", w = NAME_WIDTH);
            }
            quote => {
                let Some(offer) = quote.offer() else { continue };
                let marker = if entry.used_fallback() {
                    FALLBACK_MARKER
                } else {
                    ""
                };
                let _ = writeln!(
                    out,
                    "{:<w$}  {:<14}{:>12}  {:>14}{}",
                    name,
                    truncate(&offer.store, 14),
                    euro(offer.price),
                    per_unit(offer.usable_unit_price(), &entry.product),
                    marker,
                    w = NAME_WIDTH
                );
            }
        }
    }

    let _ = writeln!(out);
    if summary.fallback_count() > 0 {
        let _ = writeln!(out, "{FALLBACK_MARKER} offline price, live data unavailable");
    }
    let _ = writeln!(
        out,
        "{} products, {} from fallback, {} fetches failed",
        summary.len(),
        summary.fallback_count(),
        summary.failed_count()
    );
    out
}
