//! Product catalog and the JSON envelopes it travels in.

use serde::{Deserialize, Serialize};

use crate::Error;

/// A priced product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Product {
    #[serde(rename = "Producto")]
    pub name: String,
    #[serde(rename = "USD", default)]
    pub price_usd: f64,
    #[serde(rename = "CUP", default)]
    pub price_cup: f64,
}

impl Product {
    pub fn new(name: &str, price_usd: f64, price_cup: f64) -> Self {
        Self { name: name.to_string(), price_usd, price_cup }
    }
}

/// `{productos: [...]}` as served by the dataset, the search API, and the
/// synthesized offline payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchResponse {
    #[serde(default)]
    pub productos: Vec<Product>,
    /// Set only by the worker's offline payload.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub offline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
}

impl SearchResponse {
    pub fn new(productos: Vec<Product>) -> Self {
        Self { productos, offline: false, mensaje: None }
    }

    /// The payload the worker answers with when the search API is unreachable.
    pub fn offline(mensaje: &str) -> Self {
        Self { productos: Vec::new(), offline: true, mensaje: Some(mensaje.to_string()) }
    }
}

/// `{historial: [...]}` from the history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HistoryResponse {
    #[serde(default)]
    pub historial: Vec<String>,
}

/// Where the session's catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// The bundled dataset fetched at startup.
    Bundled,
    /// The built-in sample list.
    Fallback,
}

/// The in-memory product list used for local search.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    source: CatalogSource,
    products: Vec<Product>,
}

impl Catalog {
    /// The built-in list used when the dataset cannot be loaded.
    pub fn fallback() -> Self {
        Self {
            source: CatalogSource::Fallback,
            products: vec![
                Product::new("VINO TINTO RESERVA", 15.99, 380.00),
                Product::new("VINO BLANCO CHARDONNAY", 18.75, 446.25),
                Product::new("WHISKY ESCOCÉS", 32.50, 773.75),
                Product::new("VODKA RUSO", 28.90, 687.25),
                Product::new("CERVEZA ARTESANAL", 3.50, 83.25),
            ],
        }
    }

    /// Parse a bundled dataset document.
    ///
    /// Names are trimmed and uppercased, rows without a name are dropped and
    /// duplicate names keep their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `Error::UpstreamMalformed` if the body is not a `{productos}` document.
    pub fn from_dataset(body: &[u8]) -> Result<Self, Error> {
        let doc: SearchResponse = serde_json::from_slice(body)?;
        let mut seen = std::collections::HashSet::new();
        let products = doc
            .productos
            .into_iter()
            .filter_map(|p| {
                let name = p.name.trim().to_uppercase();
                if name.is_empty() || !seen.insert(name.clone()) {
                    return None;
                }
                Some(Product { name, ..p })
            })
            .collect();
        Ok(Self { source: CatalogSource::Bundled, products })
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
