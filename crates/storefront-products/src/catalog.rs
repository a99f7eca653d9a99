//! Seller catalog listing state
//!
//! Holds the list a seller dashboard renders, plus loading and error
//! flags. Error messages are end-user text.

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{Error, Result};
use crate::product::{Product, ProductDraft};
use crate::service::ProductService;

pub const SELLER_NOT_FOUND: &str = "Seller ID not found. Please log in.";
pub const FETCH_FAILED: &str = "Failed to fetch products.";
pub const NO_RESPONSE: &str = "No response from server. Please try again.";
pub const UNEXPECTED: &str = "An error occurred while fetching products.";

/// Point-in-time copy of the listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogView {
    pub products: Vec<Product>,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

pub struct SellerCatalog {
    service: ProductService,
    view: RwLock<CatalogView>,
}

impl SellerCatalog {
    pub fn new(service: ProductService) -> Self {
        Self {
            service,
            view: RwLock::new(CatalogView::default()),
        }
    }

    pub fn service(&self) -> &ProductService {
        &self.service
    }

    pub async fn view(&self) -> CatalogView {
        self.view.read().await.clone()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.view.read().await.products.clone()
    }

    /// Replace the list with the signed-in seller's products.
    pub async fn load_seller_products(&self) {
        self.begin().await;
        let result = self.service.fetch_seller_products().await;

        let mut view = self.view.write().await;
        view.is_loading = false;
        match result {
            Ok(products) => view.products = products,
            Err(e) => {
                warn!(error = %e, "failed to load seller products");
                view.error_message = Some(seller_error_message(&e));
                view.products.clear();
            }
        }
    }

    /// Replace the list with the public catalog.
    pub async fn load_public_products(&self) {
        self.begin().await;
        let result = self.service.fetch_public_products().await;

        let mut view = self.view.write().await;
        view.is_loading = false;
        match result {
            Ok(products) => view.products = products,
            Err(e) => {
                warn!(error = %e, "failed to load public products");
                view.error_message = Some(e.to_string());
                view.products.clear();
            }
        }
    }

    /// Create a product and append it to the list.
    pub async fn add(&self, draft: &ProductDraft) -> Result<Product> {
        self.begin().await;
        let result = self.service.add_product(draft).await;

        let mut view = self.view.write().await;
        view.is_loading = false;
        match result {
            Ok(product) => {
                view.products.push(product.clone());
                Ok(product)
            }
            Err(e) => {
                view.error_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Update a product and replace it in place. Products not in the list
    /// are updated on the backend only.
    pub async fn edit(&self, id: &str, draft: &ProductDraft) -> Result<Product> {
        let result = self.service.update_product(id, draft).await;

        let mut view = self.view.write().await;
        match result {
            Ok(product) => {
                if let Some(slot) = view.products.iter_mut().find(|p| p.id == id) {
                    *slot = product.clone();
                }
                Ok(product)
            }
            Err(e) => {
                view.error_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = self.service.delete_product(id).await;

        let mut view = self.view.write().await;
        match result {
            Ok(()) => {
                view.products.retain(|p| p.id != id);
                Ok(())
            }
            Err(e) => {
                view.error_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn begin(&self) {
        let mut view = self.view.write().await;
        view.is_loading = true;
        view.error_message = None;
    }
}

/// End-user message for a failed seller listing.
pub fn seller_error_message(err: &Error) -> String {
    match err {
        Error::NotAuthenticated => SELLER_NOT_FOUND.to_owned(),
        Error::Backend {
            message: Some(message),
            ..
        } => message.clone(),
        Error::Backend { message: None, .. } | Error::Unauthorized(_) => FETCH_FAILED.to_owned(),
        Error::Transport(_) => NO_RESPONSE.to_owned(),
        Error::InvalidInput(_) => UNEXPECTED.to_owned(),
    }
}
