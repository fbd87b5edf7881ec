//! Request key generation for partition entries.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::{Method, Request};

/// Human-readable request key: method and URL without fragment.
pub fn request_key(method: &Method, url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    format!("{method} {url}")
}

/// Primary key for an entry: SHA-256 of the request key.
pub fn compute_key_hash(request: &Request) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request_key(&request.method, &request.url).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> Request {
        Request::get(url).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_key_hash(&get("https://precios.example/static/js/main.js"));
        let hash2 = compute_key_hash(&get("https://precios.example/static/js/main.js"));
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_ignores_fragment() {
        let hash1 = compute_key_hash(&get("https://precios.example/index.html"));
        let hash2 = compute_key_hash(&get("https://precios.example/index.html#top"));
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_keeps_query() {
        let hash1 = compute_key_hash(&get("https://precios.example/api/productos/buscar?q=vino"));
        let hash2 = compute_key_hash(&get("https://precios.example/api/productos/buscar?q=ron"));
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_method() {
        let head = get("https://precios.example/").with_method(Method::Head);
        assert_ne!(compute_key_hash(&head), compute_key_hash(&get("https://precios.example/")));
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_key_hash(&get("https://precios.example/"));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_key_readable() {
        let req = get("https://precios.example/manifest.json#x");
        assert_eq!(request_key(&req.method, &req.url), "GET https://precios.example/manifest.json");
    }
}
