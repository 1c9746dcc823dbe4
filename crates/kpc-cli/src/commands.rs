//! Command handlers. Each one fetches through the shared [`Session`] and
//! prints a rendered table to stdout.

use std::future::Future;

use kpc_client::ClientError;
use kpc_core::Product;
use kpc_engine::{compare, resolve_comparison, summarize, Comparison};

use crate::render::{render_comparison, render_products, render_summary};
use crate::Session;

/// Awaits `fut` unless the session is cancelled first.
async fn until_cancelled<T, E>(
    session: &Session,
    fut: impl Future<Output = Result<T, E>>,
) -> anyhow::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    tokio::select! {
        biased;
        () = session.cancel.cancelled() => anyhow::bail!("cancelled"),
        result = fut => Ok(result?),
    }
}

async fn select_products(
    session: &Session,
    query: Option<&str>,
    popular: Option<u32>,
) -> anyhow::Result<Vec<Product>> {
    match popular {
        Some(limit) => until_cancelled(session, session.client.popular_products(limit)).await,
        None => {
            until_cancelled(
                session,
                session.client.search_products(query.unwrap_or_default()),
            )
            .await
        }
    }
}

/// List or search products.
///
/// # Errors
///
/// Returns an error if the backend request fails or is cancelled.
pub(crate) async fn run_products(
    session: &Session,
    query: Option<&str>,
    popular: Option<u32>,
) -> anyhow::Result<()> {
    let products = select_products(session, query, popular).await?;
    print!("{}", render_products(&products));
    Ok(())
}

/// Resolves `product_id` and ranks its offers.
///
/// The product is looked up in `GET products` first so a failing compare
/// call can still fall back. Ids missing from that list are resolved through
/// the compare endpoint itself, whose response carries the product.
async fn load_comparison(session: &Session, product_id: i64) -> anyhow::Result<Comparison> {
    let products = until_cancelled(session, session.client.list_products()).await?;
    if let Some(product) = products.into_iter().find(|p| p.id == product_id) {
        return Ok(compare(
            &product,
            &session.client,
            &session.fallback,
            &session.options,
            &session.cancel,
        )
        .await?);
    }

    tracing::debug!(product_id, "product not in list, resolving through compare");
    match until_cancelled(session, session.client.compare(product_id)).await {
        Ok(out) => Ok(resolve_comparison(
            &out.product,
            Ok::<_, ClientError>(out.offers),
            &session.fallback,
            session.options.unit_price_policy,
        )),
        Err(err)
            if matches!(
                err.downcast_ref::<ClientError>(),
                Some(ClientError::NotFound { .. })
            ) =>
        {
            anyhow::bail!("product {product_id} not found")
        }
        Err(err) => Err(err),
    }
}

/// Show the ranked offers for one product.
///
/// # Errors
///
/// Returns an error if the product id is unknown, the backend cannot be
/// reached to resolve it, or the command is cancelled.
pub(crate) async fn run_compare(session: &Session, product_id: i64) -> anyhow::Result<()> {
    println!("loading prices for product {product_id}...");
    let comparison = load_comparison(session, product_id).await?;
    print!("{}", render_comparison(&comparison));
    Ok(())
}

/// Print the cheapest store for each selected product.
///
/// # Errors
///
/// Returns an error if the product list cannot be fetched, the run is
/// cancelled, or every product fetch failed with no fallback to show.
pub(crate) async fn run_summary(
    session: &Session,
    query: Option<&str>,
    popular: Option<u32>,
) -> anyhow::Result<()> {
    let products = select_products(session, query, popular).await?;
    println!("loading prices for {} products...", products.len());

    let summary = summarize(
        &products,
        &session.client,
        &session.fallback,
        &session.options,
        &session.cancel,
    )
    .await?;

    print!("{}", render_summary(&summary));

    if summary.all_failed() {
        anyhow::bail!(
            "could not load prices: all {} product fetches failed",
            summary.failed_count()
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_test.rs"]
mod tests;
