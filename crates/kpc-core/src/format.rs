//! Display helpers shared by presentation layers.

use chrono::{DateTime, Utc};

use crate::products::UnitKind;

/// Placeholder shown for a missing amount or size.
pub const MISSING: &str = "—";

/// Formats an amount as a German-locale euro string: `"1.234,50 €"`.
///
/// `None` and non-finite values render as [`MISSING`].
#[must_use]
pub fn euro(amount: Option<f64>) -> String {
    let Some(value) = amount.filter(|v| v.is_finite()) else {
        return MISSING.to_string();
    };

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped},{frac_part} €")
}

/// Subtitle under a product card: `"250 g"`, `"1 L • 3.5%"`, `"—"`.
#[must_use]
pub fn product_subtitle(size_ml_g: Option<i64>, unit: UnitKind, fat_pct: Option<f64>) -> String {
    let size = size_ml_g.map_or_else(
        || MISSING.to_string(),
        |n| match unit {
            UnitKind::Ml if n % 1000 == 0 => format!("{} L", n / 1000),
            UnitKind::Ml => format!("{n} ml"),
            UnitKind::G if n % 1000 == 0 => format!("{} kg", n / 1000),
            UnitKind::G => format!("{n} g"),
        },
    );

    match fat_pct {
        Some(pct) => format!("{size} • {pct}%"),
        None => size,
    }
}

/// Collection time of an offer as `"2025-09-30 08:15"` (UTC).
#[must_use]
pub fn collected_at(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || MISSING.to_string(),
        |ts| ts.format("%Y-%m-%d %H:%M").to_string(),
    )
}
