//! Product search request parameters and validation.

use serde::Serialize;
use url::Url;

use precios_core::Error;

/// Query for `GET /api/productos/buscar`.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Search text, sent as-is (the server normalizes).
    pub q: String,

    /// Result cap; omitted means the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limite: Option<usize>,
}

impl ProductQuery {
    pub fn new(q: &str) -> Self {
        Self { q: q.to_string(), limite: None }
    }

    pub fn with_limit(mut self, limite: usize) -> Self {
        self.limite = Some(limite);
        self
    }

    /// Reject queries the endpoint would refuse.
    pub fn validate(&self) -> Result<(), Error> {
        if self.q.trim().is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".to_string()));
        }

        if let Some(limite) = self.limite
            && limite == 0
        {
            return Err(Error::InvalidInput("limite must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Endpoint URL with `q` (and `limite` when set) appended.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", &self.q);
            if let Some(limite) = self.limite {
                pairs.append_pair("limite", &limite.to_string());
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("http://localhost:8000/api/productos/buscar").unwrap()
    }

    #[test]
    fn test_valid_query() {
        assert!(ProductQuery::new("vino").with_limit(10).validate().is_ok());
    }

    #[test]
    fn test_empty_query() {
        assert!(matches!(ProductQuery::new("  ").validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_long_query_accepted() {
        let query = ProductQuery::new(&"VINO ".repeat(60)).with_limit(50);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_zero_limit() {
        let query = ProductQuery::new("ron").with_limit(0);
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_to_url_with_limit() {
        let url = ProductQuery::new("vino").with_limit(10).to_url(&endpoint());
        assert_eq!(url.as_str(), "http://localhost:8000/api/productos/buscar?q=vino&limite=10");
    }

    #[test]
    fn test_to_url_encodes_query() {
        let url = ProductQuery::new("vino tinto").to_url(&endpoint());
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, "vino tinto");
    }
}
