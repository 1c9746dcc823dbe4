//! Static seed offers for products the live source has nothing for.
//!
//! Lookup is by exact `canonical_name`. That key is a display string and
//! will silently stop matching if the backend renames a product; swapping
//! it for a stable identifier only requires a new [`FallbackProvider`].

use std::collections::HashMap;

use kpc_core::{FallbackFile, Offer, Product};

/// Supplies seed offers for a product. Must be pure: the same product
/// always yields the same list, and an unknown product yields an empty one.
pub trait FallbackProvider {
    fn fallback(&self, product: &Product) -> Vec<Offer>;
}

/// Disables fallback entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackProvider for NoFallback {
    fn fallback(&self, _product: &Product) -> Vec<Offer> {
        Vec::new()
    }
}

const BUILTIN_CURRENCY: &str = "EUR";

/// `(store, price_eur, unit_price)`.
type Seed = (&'static str, f64, Option<f64>);

/// Compiled-in essential products. Mirrors `config/fallback.yaml`.
const ESSENTIALS: &[(&str, &[Seed])] = &[
    (
        "Milk 1L 2.8%",
        &[
            ("Albi", 0.99, Some(0.99)),
            ("Interex", 1.05, Some(1.05)),
            ("Viva Fresh", 1.09, Some(1.09)),
            ("SPAR", 1.15, None),
        ],
    ),
    (
        "Milk 1L 3.5%",
        &[
            ("Viva Fresh", 1.15, Some(1.15)),
            ("Maxi", 1.19, Some(1.19)),
            ("Albi", 1.25, None),
        ],
    ),
    (
        "Feta / White Cheese 400g",
        &[
            ("Interex", 2.79, Some(6.98)),
            ("Albi", 2.95, Some(7.38)),
            ("SPAR", 3.29, Some(8.23)),
        ],
    ),
    (
        "Yogurt 1kg tub",
        &[("Maxi", 1.49, Some(1.49)), ("Viva Fresh", 1.55, Some(1.55))],
    ),
    (
        "Butter 250g",
        &[
            ("Albi", 2.49, Some(9.96)),
            ("Interex", 2.59, Some(10.36)),
            ("SPAR", 2.99, None),
        ],
    ),
    (
        "Potatoes per kg",
        &[
            ("Maxi", 0.55, Some(0.55)),
            ("Albi", 0.59, Some(0.59)),
            ("Viva Fresh", 0.65, Some(0.65)),
        ],
    ),
];

/// Fixed table of seed offers keyed by exact `canonical_name`.
#[derive(Debug, Clone, Default)]
pub struct StaticFallback {
    table: HashMap<String, Vec<Offer>>,
}

impl StaticFallback {
    /// The compiled-in essential-product table.
    #[must_use]
    pub fn builtin() -> Self {
        let table = ESSENTIALS
            .iter()
            .map(|(name, seeds)| {
                let offers = seeds
                    .iter()
                    .map(|(store, price, unit)| Offer::seed(store, *price, *unit, BUILTIN_CURRENCY))
                    .collect();
                ((*name).to_owned(), offers)
            })
            .collect();
        Self { table }
    }

    /// Builds the table from a validated fallback file.
    #[must_use]
    pub fn from_file(file: &FallbackFile) -> Self {
        let table = file
            .products
            .iter()
            .map(|product| {
                let offers = product
                    .offers
                    .iter()
                    .map(|seed| {
                        Offer::seed(&seed.store, seed.price_eur, seed.unit_price, &file.currency)
                    })
                    .collect();
                (product.canonical_name.clone(), offers)
            })
            .collect();
        Self { table }
    }

    #[must_use]
    pub fn contains(&self, canonical_name: &str) -> bool {
        self.table.contains_key(canonical_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl FallbackProvider for StaticFallback {
    fn fallback(&self, product: &Product) -> Vec<Offer> {
        self.table
            .get(&product.canonical_name)
            .cloned()
            .unwrap_or_default()
    }
}
