//! Substring search over the product catalog.
//!
//! Matching is case-insensitive containment of the trimmed query in the
//! product name. Results keep catalog order; there is no re-ranking.

use crate::catalog::{Catalog, Product};

/// Cap on full search results.
pub const SEARCH_LIMIT: usize = 50;

/// Cap on suggestion lists.
pub const SUGGEST_LIMIT: usize = 10;

/// Uppercased, trimmed query, or `None` when nothing is left to match.
pub fn normalize_query(query: &str) -> Option<String> {
    let normalized = query.trim().to_uppercase();
    if normalized.is_empty() { None } else { Some(normalized) }
}

/// Search the catalog with the default cap.
pub fn search(query: &str, catalog: &Catalog) -> Vec<Product> {
    search_limited(query, catalog.products(), SEARCH_LIMIT)
}

/// Suggestion names with the default cap.
pub fn suggest(query: &str, catalog: &Catalog) -> Vec<String> {
    suggest_limited(query, catalog.products(), SUGGEST_LIMIT)
}

/// Products whose name contains the query, in input order, at most `limit`.
///
/// An empty or whitespace-only query returns an empty set without scanning.
pub fn search_limited(query: &str, products: &[Product], limit: usize) -> Vec<Product> {
    let Some(needle) = normalize_query(query) else {
        return Vec::new();
    };

    products
        .iter()
        .filter(|p| p.name.to_uppercase().contains(&needle))
        .take(limit)
        .cloned()
        .collect()
}

/// The first `limit` names of the same filtered order `search_limited` uses.
pub fn suggest_limited(query: &str, products: &[Product], limit: usize) -> Vec<String> {
    search_limited(query, products, limit)
        .into_iter()
        .map(|p| p.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn many(n: usize) -> Vec<Product> {
        (0..n).map(|i| Product::new(&format!("RON {i:03}"), 1.0, 24.0)).collect()
    }

    #[test]
    fn test_empty_query() {
        let catalog = Catalog::fallback();
        assert!(search("", &catalog).is_empty());
        assert!(search("   ", &catalog).is_empty());
        assert!(suggest("", &catalog).is_empty());
    }

    #[test]
    fn test_vino_against_fallback() {
        let catalog = Catalog::fallback();
        let names: Vec<_> = search("VINO", &catalog).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["VINO TINTO RESERVA", "VINO BLANCO CHARDONNAY"]);
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let catalog = Catalog::fallback();
        assert_eq!(search("  vodka ", &catalog).len(), 1);
        assert_eq!(search("escocés", &catalog)[0].name, "WHISKY ESCOCÉS");
    }

    #[test]
    fn test_results_contain_query() {
        let catalog = Catalog::fallback();
        for q in ["o", "in", "ve", "ruso", "x"] {
            let needle = q.to_uppercase();
            for product in search(q, &catalog) {
                assert!(product.name.contains(&needle), "{} should contain {}", product.name, needle);
            }
        }
    }

    #[test]
    fn test_no_match() {
        assert!(search("XYZ", &Catalog::fallback()).is_empty());
    }

    #[test]
    fn test_search_cap() {
        let products = many(80);
        let results = search_limited("ron", &products, SEARCH_LIMIT);
        assert_eq!(results.len(), 50);
        assert_eq!(results[0].name, "RON 000");
        assert_eq!(results[49].name, "RON 049");
    }

    #[test]
    fn test_suggest_is_prefix_of_search() {
        let products = many(30);
        let suggestions = suggest_limited("ron", &products, SUGGEST_LIMIT);
        let full: Vec<_> = search_limited("ron", &products, SEARCH_LIMIT)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(suggestions.len(), 10);
        assert_eq!(suggestions, full[..10]);
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query(" vino "), Some("VINO".to_string()));
        assert_eq!(normalize_query("\t"), None);
    }
}
