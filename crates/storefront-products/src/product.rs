//! Product model and response envelopes

use serde::{Deserialize, Serialize};

/// Placeholder returned by [`product_image`] when a product has no thumbnail.
pub const NO_IMAGE: &str = "no image";

/// A product as stored by the backend.
///
/// Fields not modelled here (seller, stock, timestamps) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Fields sent when creating or updating a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// Display image for a product: the thumbnail, or [`NO_IMAGE`].
pub fn product_image(product: &Product) -> &str {
    product
        .thumbnail
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(NO_IMAGE)
}

/// List responses come either wrapped (`{ "products": [...] }`) or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductList {
    Wrapped {
        #[serde(default)]
        products: Option<Vec<Product>>,
    },
    Bare(Vec<Product>),
}

impl ProductList {
    pub(crate) fn into_products(self) -> Vec<Product> {
        match self {
            ProductList::Wrapped { products } => products.unwrap_or_default(),
            ProductList::Bare(products) => products,
        }
    }
}

/// Single-product responses: `{ "product": {...} }` or the product itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductBody {
    Wrapped { product: Product },
    Bare(Product),
}

impl ProductBody {
    pub(crate) fn into_product(self) -> Product {
        match self {
            ProductBody::Wrapped { product } | ProductBody::Bare(product) => product,
        }
    }
}
