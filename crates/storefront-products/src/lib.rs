//! Storefront product catalog
//!
//! Resource fetchers that depend on the session's identity. Seller-scoped
//! requests read the seller id and access token from the `SessionManager`
//! at the moment they are sent, and recover from an expired token with a
//! single shared refresh.

pub mod catalog;
pub mod error;
pub mod product;
pub mod service;

#[cfg(test)]
mod test_support;

pub use catalog::{CatalogView, SellerCatalog};
pub use error::{Error, Result};
pub use product::{NO_IMAGE, Product, ProductDraft, product_image};
pub use service::ProductService;
