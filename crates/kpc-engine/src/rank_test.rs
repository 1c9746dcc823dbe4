use kpc_core::UnitKind;

use super::*;

fn offer(store: &str, price: Option<f64>, unit_price: Option<f64>) -> Offer {
    Offer {
        store: store.to_owned(),
        raw_name: format!("{store} item"),
        url: None,
        price,
        unit_price,
        currency: Some("EUR".to_owned()),
        collected_at: None,
        promo: false,
        promo_valid_from: None,
        promo_valid_to: None,
    }
}

fn stores(ranked: &[RankedOffer<'_>]) -> Vec<String> {
    ranked.iter().map(|r| r.offer.store.clone()).collect()
}

/// Every ordering of `items` (Heap's algorithm).
fn permutations(items: &[Offer]) -> Vec<Vec<Offer>> {
    fn heap(k: usize, items: &mut Vec<Offer>, out: &mut Vec<Vec<Offer>>) {
        if k <= 1 {
            out.push(items.clone());
            return;
        }
        for i in 0..k {
            heap(k - 1, items, out);
            if k % 2 == 0 {
                items.swap(i, k - 1);
            } else {
                items.swap(0, k - 1);
            }
        }
    }
    let mut out = Vec::new();
    heap(items.len(), &mut items.to_vec(), &mut out);
    out
}

fn mixed_offers() -> Vec<Offer> {
    vec![
        offer("Albi", Some(0.99), None),
        offer("Interex", Some(0.95), Some(0.95)),
        offer("Viva Fresh", Some(2.10), None),
        offer("Maxi", None, None),
        offer("SPAR", Some(1.20), Some(1.20)),
    ]
}

// -----------------------------------------------------------------------
// rank
// -----------------------------------------------------------------------

#[test]
fn rank_empty_is_empty() {
    assert!(rank(&[]).is_empty());
}

#[test]
fn rank_orders_by_unit_price_then_price() {
    let offers = vec![
        offer("A", Some(0.99), None),
        offer("B", Some(0.95), Some(0.95)),
        offer("C", Some(2.10), None),
    ];
    assert_eq!(stores(&rank(&offers)), ["B", "A", "C"]);
}

#[test]
fn rank_known_unit_price_beats_lower_shelf_price() {
    let offers = vec![
        offer("cheap-shelf", Some(0.50), None),
        offer("known-unit", Some(3.00), Some(12.00)),
    ];
    assert_eq!(stores(&rank(&offers)), ["known-unit", "cheap-shelf"]);
}

#[test]
fn rank_full_tie_keeps_input_order() {
    let offers = vec![
        offer("first", Some(2.49), Some(6.22)),
        offer("second", Some(2.49), Some(6.22)),
    ];
    assert_eq!(stores(&rank(&offers)), ["first", "second"]);

    let reversed = vec![offers[1].clone(), offers[0].clone()];
    assert_eq!(stores(&rank(&reversed)), ["second", "first"]);
}

#[test]
fn rank_all_unknown_degenerates_to_input_order() {
    let offers = vec![
        offer("z", None, None),
        offer("a", None, Some(f64::NAN)),
        offer("m", Some(-1.0), None),
    ];
    assert_eq!(stores(&rank(&offers)), ["z", "a", "m"]);
}

#[test]
fn rank_exposes_effective_unit_price() {
    let offers = vec![offer("A", Some(1.0), Some(-3.0)), offer("B", Some(1.0), Some(4.0))];
    let ranked = rank(&offers);
    assert_eq!(ranked[0].offer.store, "B");
    assert_eq!(ranked[0].unit_price_effective, Some(4.0));
    assert_eq!(ranked[1].unit_price_effective, None);
}

#[test]
fn rank_does_not_mutate_input() {
    let offers = mixed_offers();
    let before = offers.clone();
    let _ = rank(&offers);
    assert_eq!(offers, before);
}

#[test]
fn rank_places_priceless_offers_last_for_every_permutation() {
    for perm in permutations(&mixed_offers()) {
        let ranked = rank(&perm);
        assert_eq!(ranked.last().unwrap().offer.store, "Maxi", "input: {perm:?}");
        let usable: Vec<_> = ranked.iter().take(4).collect();
        assert!(usable.iter().all(|r| r.has_usable_price()));
    }
}

#[test]
fn rank_is_idempotent() {
    for perm in permutations(&mixed_offers()) {
        let once: Vec<Offer> = rank(&perm).iter().map(|r| r.offer.clone()).collect();
        let twice: Vec<Offer> = rank(&once).iter().map(|r| r.offer.clone()).collect();
        assert_eq!(once, twice);
    }
}

#[test]
fn rank_with_derivation_uses_pack_size() {
    let product = Product {
        id: 5,
        canonical_name: "Butter 250g".to_owned(),
        category: "butter".to_owned(),
        unit: UnitKind::G,
        brand: None,
        size_ml_g: Some(250),
        fat_pct: None,
    };
    let offers = vec![
        offer("upstream", Some(2.80), Some(11.20)),
        offer("derived", Some(2.49), None),
    ];
    assert_eq!(stores(&rank(&offers)), ["upstream", "derived"]);

    let ranked = rank_with(&offers, &product, UnitPricePolicy::DeriveMissing);
    assert_eq!(stores(&ranked), ["derived", "upstream"]);
    assert_eq!(ranked[0].unit_price_effective, Some(9.96));
}

// -----------------------------------------------------------------------
// cheapest
// -----------------------------------------------------------------------

#[test]
fn cheapest_empty_is_none() {
    assert!(cheapest(&[]).is_none());
}

#[test]
fn cheapest_all_unusable_is_none() {
    let offers = vec![offer("a", None, None), offer("b", Some(f64::NAN), Some(-2.0))];
    assert!(cheapest(&offers).is_none());
}

#[test]
fn cheapest_skips_unusable_offers() {
    let offers = vec![offer("nothing", None, None), offer("only", Some(3.10), None)];
    assert_eq!(cheapest(&offers).unwrap().store, "only");
}

#[test]
fn cheapest_first_encountered_wins_tie() {
    let offers = vec![
        offer("first", Some(2.49), Some(6.22)),
        offer("second", Some(2.49), Some(6.22)),
    ];
    assert_eq!(cheapest(&offers).unwrap().store, "first");
}

#[test]
fn cheapest_matches_first_ranked_for_every_permutation() {
    for perm in permutations(&mixed_offers()) {
        let ranked = rank(&perm);
        let first = ranked[0];
        assert!(first.has_usable_price());
        assert_eq!(cheapest(&perm), Some(first.offer), "input: {perm:?}");
    }
}

#[test]
fn cheapest_matches_first_ranked_with_ties_in_every_permutation() {
    let offers = vec![
        offer("t1", Some(2.49), Some(6.22)),
        offer("t2", Some(2.49), Some(6.22)),
        offer("p1", Some(1.00), None),
        offer("p2", Some(1.00), None),
    ];
    for perm in permutations(&offers) {
        assert_eq!(cheapest(&perm), Some(rank(&perm)[0].offer));
    }
}

#[test]
fn cheapest_with_derivation_matches_rank_with() {
    let product = Product {
        id: 9,
        canonical_name: "Milk 1L 3.5%".to_owned(),
        category: "milk".to_owned(),
        unit: UnitKind::Ml,
        brand: None,
        size_ml_g: Some(1000),
        fat_pct: Some(3.5),
    };
    let offers = vec![
        offer("a", Some(1.19), Some(1.19)),
        offer("b", Some(1.09), None),
        offer("c", None, None),
    ];
    let policy = UnitPricePolicy::DeriveMissing;
    let best = cheapest_with(&offers, &product, policy).unwrap();
    assert_eq!(best.store, "b");
    assert_eq!(Some(best), rank_with(&offers, &product, policy).first().map(|r| r.offer));
}
