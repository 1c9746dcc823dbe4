use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kpc_core::{PriceOut, Product, UnitKind};
use kpc_engine::{
    compare, offer_source_fn, summarize, EngineError, FetchOutcome, NoFallback, OfferOrigin,
    Quote, StaticFallback, SummarizeOptions,
};
use tokio_util::sync::CancellationToken;

fn product(id: i64, name: &str) -> Product {
    Product {
        id,
        canonical_name: name.to_owned(),
        category: "grocery".to_owned(),
        unit: UnitKind::Ml,
        brand: None,
        size_ml_g: Some(1000),
        fat_pct: None,
    }
}

fn record(store: &str, price: Option<f64>, unit_price: Option<f64>) -> PriceOut {
    PriceOut {
        store: Some(store.to_owned()),
        raw_name: Some(format!("{store} item")),
        price_eur: price,
        unit_price,
        currency: Some("EUR".to_owned()),
        ..PriceOut::default()
    }
}

fn live_records(id: i64) -> Vec<PriceOut> {
    #[allow(clippy::cast_precision_loss)]
    let base = id as f64;
    vec![
        record("Maxi", Some(base + 0.5), Some(base + 0.5)),
        record("Albi", Some(base + 0.25), Some(base + 0.25)),
    ]
}

fn store_of(quote: &Quote) -> Option<&str> {
    quote.offer().map(|o| o.store.as_str())
}

#[tokio::test]
async fn failing_product_does_not_affect_others() {
    let products = vec![
        product(1, "Oat Drink 1L"),
        product(2, "Rice 1kg"),
        product(3, "Olive Oil 1L"),
    ];
    let source = offer_source_fn(|id| async move {
        if id == 2 {
            Err("upstream returned 502".to_owned())
        } else {
            Ok(live_records(id))
        }
    });

    let summary = summarize(
        &products,
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.len(), 3);
    assert_eq!(store_of(&summary.get(1).unwrap().quote), Some("Albi"));
    assert_eq!(store_of(&summary.get(3).unwrap().quote), Some("Albi"));

    let failed = summary.get(2).unwrap();
    assert_eq!(failed.quote, Quote::NoOffers);
    assert_eq!(
        failed.fetch,
        FetchOutcome::Failed("upstream returned 502".to_owned())
    );
    assert_eq!(summary.failed_count(), 1);
    assert!(!summary.all_failed());
}

#[tokio::test]
async fn empty_result_uses_fallback_or_reports_no_offer() {
    let products = vec![product(10, "Milk 1L 2.8%"), product(11, "X")];
    let source = offer_source_fn(|_| async { Ok::<_, String>(Vec::new()) });

    let summary = summarize(
        &products,
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let milk = summary.get(10).unwrap();
    assert!(milk.used_fallback());
    assert_eq!(milk.fetch, FetchOutcome::Empty);
    let offer = milk.offer().unwrap();
    assert_eq!(offer.store, "Albi");
    assert_eq!(offer.price, Some(0.99));
    assert!(!offer.promo);
    assert!(offer.collected_at.is_none());

    let unknown = summary.get(11).unwrap();
    assert_eq!(unknown.quote, Quote::NoOffers);
    assert_eq!(unknown.fetch, FetchOutcome::Empty);

    assert_eq!(summary.fallback_count(), 1);
    assert_eq!(summary.no_offer_count(), 1);
}

#[tokio::test]
async fn failed_fetch_falls_back_for_known_product() {
    let products = vec![product(20, "Butter 250g")];
    let source = offer_source_fn(|_| async { Err::<Vec<PriceOut>, _>("timed out") });

    let summary = summarize(
        &products,
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let entry = summary.get(20).unwrap();
    assert_eq!(entry.quote.origin(), Some(OfferOrigin::Fallback));
    assert_eq!(store_of(&entry.quote), Some("Albi"));
    assert!(entry.fetch.is_failed());
    assert!(!summary.all_failed());
}

#[tokio::test]
async fn all_failed_when_nothing_is_rescued() {
    let products = vec![product(1, "A"), product(2, "B")];
    let source = offer_source_fn(|_| async { Err::<Vec<PriceOut>, _>("connection refused") });

    let summary = summarize(
        &products,
        &source,
        &NoFallback,
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.failed_count(), 2);
    assert!(summary.all_failed());
}

#[tokio::test(start_paused = true)]
async fn result_is_independent_of_arrival_order() {
    let products: Vec<Product> = (1..=5).map(|id| product(id, &format!("P{id}"))).collect();
    // Later products answer first.
    let source = offer_source_fn(|id| async move {
        let delay = u64::try_from(10 - id).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay * 10)).await;
        Ok::<_, String>(live_records(id))
    });

    let fanned_out = summarize(
        &products,
        &source,
        &NoFallback,
        &SummarizeOptions {
            max_concurrent: 5,
            ..SummarizeOptions::default()
        },
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let sequential = summarize(
        &products,
        &source,
        &NoFallback,
        &SummarizeOptions {
            max_concurrent: 1,
            ..SummarizeOptions::default()
        },
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let ids: Vec<i64> = fanned_out.iter().map(|e| e.product.id).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5]);
    assert_eq!(fanned_out, sequential);
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let products: Vec<Product> = (1..=8).map(|id| product(id, &format!("P{id}"))).collect();

    let source = {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        offer_source_fn(move |id| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(live_records(id))
            }
        })
    };

    let summary = summarize(
        &products,
        &source,
        &NoFallback,
        &SummarizeOptions {
            max_concurrent: 3,
            ..SummarizeOptions::default()
        },
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.len(), 8);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn cancellation_discards_partial_results() {
    let token = CancellationToken::new();
    let products = vec![product(1, "A"), product(2, "B"), product(3, "C")];

    let source = {
        let token = token.clone();
        offer_source_fn(move |id| {
            let token = token.clone();
            async move {
                if id == 2 {
                    token.cancel();
                    std::future::pending::<()>().await;
                }
                Ok::<_, String>(live_records(id))
            }
        })
    };

    let err = summarize(
        &products,
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &token,
    )
    .await
    .unwrap_err();

    match err {
        EngineError::Cancelled { settled, total } => {
            assert_eq!(total, 3);
            assert!(settled < 3);
        }
    }
}

#[tokio::test]
async fn cancelled_before_start_never_fetches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();
    token.cancel();

    let source = {
        let calls = Arc::clone(&calls);
        offer_source_fn(move |id| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(live_records(id))
            }
        })
    };

    let result = summarize(
        &[product(1, "A")],
        &source,
        &NoFallback,
        &SummarizeOptions::default(),
        &token,
    )
    .await;

    assert!(matches!(
        result,
        Err(EngineError::Cancelled {
            settled: 0,
            total: 1
        })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_products_are_each_summarized() {
    let products = vec![product(7, "A"), product(8, "B"), product(7, "A")];
    let source = offer_source_fn(|id| async move { Ok::<_, String>(live_records(id)) });

    let summary = summarize(
        &products,
        &source,
        &NoFallback,
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let ids: Vec<i64> = summary.iter().map(|e| e.product.id).collect();
    assert_eq!(ids, [7, 8, 7]);
}

#[tokio::test]
async fn empty_product_list_yields_empty_summary() {
    let source = offer_source_fn(|id| async move { Ok::<_, String>(live_records(id)) });

    let summary = summarize(
        &[],
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(summary.is_empty());
    assert!(!summary.all_failed());
}

#[tokio::test]
async fn compare_ranks_live_offers() {
    let source = offer_source_fn(|_| async {
        Ok::<_, String>(vec![
            record("A", Some(0.99), None),
            record("B", Some(0.95), Some(0.95)),
            record("C", Some(2.10), None),
        ])
    });

    let comparison = compare(
        &product(1, "Milk 1L 2.8%"),
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(comparison.origin(), Some(OfferOrigin::Live));
    let stores: Vec<&str> = comparison
        .offers()
        .iter()
        .map(|c| c.offer.store.as_str())
        .collect();
    assert_eq!(stores, ["B", "A", "C"]);
}

#[tokio::test]
async fn compare_lists_priceless_live_offers_instead_of_fallback() {
    let source = offer_source_fn(|_| async {
        Ok::<_, String>(vec![
            record("Maxi", None, None),
            record("Albi", Some(f64::NAN), None),
        ])
    });

    let comparison = compare(
        &product(1, "Butter 250g"),
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(comparison.origin(), Some(OfferOrigin::Live));
    let stores: Vec<&str> = comparison
        .offers()
        .iter()
        .map(|c| c.offer.store.as_str())
        .collect();
    assert_eq!(stores, ["Maxi", "Albi"]);
}

#[tokio::test]
async fn compare_falls_back_on_failure() {
    let source = offer_source_fn(|_| async { Err::<Vec<PriceOut>, _>("503") });

    let comparison = compare(
        &product(1, "Potatoes per kg"),
        &source,
        &StaticFallback::builtin(),
        &SummarizeOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(comparison.origin(), Some(OfferOrigin::Fallback));
    assert_eq!(comparison.offers().len(), 3);
    assert_eq!(comparison.offers()[0].offer.store, "Maxi");
    assert!(comparison.fetch.is_failed());
}

#[tokio::test]
async fn compare_respects_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let source = offer_source_fn(|_| async { Ok::<_, String>(Vec::new()) });

    let result = compare(
        &product(1, "A"),
        &source,
        &NoFallback,
        &SummarizeOptions::default(),
        &token,
    )
    .await;

    assert!(matches!(result, Err(EngineError::Cancelled { .. })));
}
