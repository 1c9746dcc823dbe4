use kpc_core::{PriceOut, Product};
use kpc_engine::OfferSource;

use crate::client::ApiClient;
use crate::error::ClientError;

impl OfferSource for ApiClient {
    type Error = ClientError;

    async fn fetch(&self, product: &Product) -> Result<Vec<PriceOut>, ClientError> {
        let out = self.compare(product.id).await?;
        Ok(out.offers)
    }
}
