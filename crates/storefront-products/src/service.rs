//! Product endpoints behind the session
//!
//! Authorized requests read the access token from the session on every
//! attempt. A 401 (or no token at all) triggers one session refresh and one
//! retry; the refresh is shared with any other caller that hit the same
//! expiry.

use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use storefront_session::SessionManager;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::product::{Product, ProductBody, ProductDraft, ProductList};

const PRODUCTS_PATH: &str = "/api/products";

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct ProductService {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ProductService {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: Arc<SessionManager>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Products owned by the signed-in seller.
    ///
    /// A provisional (cached, unverified) identity is checked against the
    /// backend first.
    #[instrument(skip_all)]
    pub async fn fetch_seller_products(&self) -> Result<Vec<Product>> {
        if self.session.snapshot().is_provisional() {
            debug!("revalidating provisional identity");
            self.session.fetch_user_data().await;
        }
        // Fail before any request when there is no seller at all.
        self.seller_id()?;

        let response = self
            .send_authorized(|| {
                let seller_id = self.seller_id()?;
                Ok(self
                    .http
                    .get(self.endpoint(&format!("{PRODUCTS_PATH}/seller/{seller_id}"))))
            })
            .await?;
        let list: ProductList = decode(response).await?;
        let products = list.into_products();
        debug!(count = products.len(), "fetched seller products");
        Ok(products)
    }

    /// The public catalog. No credentials are sent.
    pub async fn fetch_public_products(&self) -> Result<Vec<Product>> {
        let response = self
            .http
            .get(self.endpoint(PRODUCTS_PATH))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("products request failed: {e}")))?;
        let list: ProductList = decode(check_status(response).await?).await?;
        Ok(list.into_products())
    }

    pub async fn add_product(&self, draft: &ProductDraft) -> Result<Product> {
        if draft.name.trim().is_empty() {
            return Err(Error::InvalidInput("product name is required".into()));
        }
        let url = self.endpoint(PRODUCTS_PATH);
        let response = self
            .send_authorized(|| Ok(self.http.post(&url).json(draft)))
            .await?;
        let body: ProductBody = decode(response).await?;
        let product = body.into_product();
        debug!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, draft: &ProductDraft) -> Result<Product> {
        let url = self.product_url(id)?;
        let response = self
            .send_authorized(|| Ok(self.http.put(&url).json(draft)))
            .await?;
        let body: ProductBody = decode(response).await?;
        Ok(body.into_product())
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        let url = self.product_url(id)?;
        self.send_authorized(|| Ok(self.http.delete(&url))).await?;
        debug!(product_id = id, "product deleted");
        Ok(())
    }

    fn product_url(&self, id: &str) -> Result<String> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::InvalidInput("product id is required".into()));
        }
        Ok(self.endpoint(&format!("{PRODUCTS_PATH}/{id}")))
    }

    /// Seller id of the current user, read fresh each time.
    fn seller_id(&self) -> Result<String> {
        self.session
            .current_user()
            .map(|user| user.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or(Error::NotAuthenticated)
    }

    /// Send with the session's bearer token, refreshing and retrying once
    /// on 401. Non-2xx answers other than 401 become `Error::Backend`.
    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut retried = false;
        loop {
            let epoch = self.session.refresh_epoch();

            if let Some(token) = self.session.access_token() {
                let response = build()?
                    .bearer_auth(token.expose())
                    .send()
                    .await
                    .map_err(|e| Error::Transport(format!("request failed: {e}")))?;
                if response.status() != StatusCode::UNAUTHORIZED {
                    return check_status(response).await;
                }
            }

            if retried {
                warn!("request still unauthorized after session refresh");
                return Err(Error::Unauthorized(
                    "backend rejected the refreshed session".into(),
                ));
            }
            retried = true;

            debug!("request unauthorized, refreshing session");
            if !self.session.refresh_since(epoch).await {
                return Err(Error::Unauthorized("session refresh failed".into()));
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());
    Err(Error::Backend {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Transport(format!("invalid products response: {e}")))
}
