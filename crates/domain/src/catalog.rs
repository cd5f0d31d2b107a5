//! Catalog reads: product listings, categories and price bounds.
//!
//! The catalog is read-only from the storefront's point of view and needs no
//! identity.

use common::{CategoryId, Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{Category, ProductDetails, ProductQuery, ProductSort, Store};

use crate::error::{DomainError, StoreResultExt};

/// Number of products shown on the featured shelf.
pub const FEATURED_LIMIT: usize = 6;

/// Number of results returned by a quick search.
pub const SEARCH_LIMIT: usize = 10;

/// Product listing filters as sent by a storefront page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    /// Category id, or a slug such as `hot-drinks`.
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub min_rating: Option<f64>,
    pub featured: Option<bool>,
    pub sort: Option<ProductSort>,
    pub limit: Option<usize>,
}

/// Whole-dollar bounds of the prices currently on offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self { min: 0, max: 100 }
    }
}

/// Service for browsing the catalog.
#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists in-stock products matching the filter.
    ///
    /// An unknown category slug matches nothing.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductDetails>, DomainError> {
        let mut query = ProductQuery::new().sort(filter.sort.unwrap_or_default());

        if let Some(ref category) = filter.category {
            match self.resolve_category(category).await? {
                Some(category_id) => query = query.category(category_id),
                None => return Ok(Vec::new()),
            }
        }
        if let Some(ref term) = filter.search
            && !term.trim().is_empty()
        {
            query = query.search(term.trim());
        }
        if let Some(cents) = filter.min_price_cents {
            query = query.min_price(Money::from_cents(cents));
        }
        if let Some(cents) = filter.max_price_cents {
            query = query.max_price(Money::from_cents(cents));
        }
        if let Some(rating) = filter.min_rating {
            query = query.min_rating(rating);
        }
        if let Some(featured) = filter.featured {
            query = query.featured(featured);
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        self.store
            .query_products(&query)
            .await
            .or_fail("Failed to load products")
    }

    /// Loads a product with its category and variants.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductDetails>, DomainError> {
        self.store
            .get_product(product_id)
            .await
            .or_fail("Failed to load product")
    }

    /// Lists all categories by name.
    #[tracing::instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        self.store
            .list_categories()
            .await
            .or_fail("Failed to load categories")
    }

    /// The best-rated featured products.
    #[tracing::instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Vec<ProductDetails>, DomainError> {
        let query = ProductQuery::new()
            .featured(true)
            .sort(ProductSort::Rating)
            .limit(FEATURED_LIMIT);

        self.store
            .query_products(&query)
            .await
            .or_fail("Failed to load featured products")
    }

    /// Quick search over product names and descriptions: featured products
    /// first, then by rating.
    #[tracing::instrument(skip(self))]
    pub async fn search_products(&self, term: &str) -> Result<Vec<ProductDetails>, DomainError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let query = ProductQuery::new().search(term).sort(ProductSort::Rating);
        let mut products = self
            .store
            .query_products(&query)
            .await
            .or_fail("Failed to search products")?;

        // Stable, so rating order holds within each group
        products.sort_by(|a, b| b.product.featured.cmp(&a.product.featured));
        products.truncate(SEARCH_LIMIT);
        Ok(products)
    }

    /// Floor of the cheapest and ceiling of the dearest in-stock price.
    #[tracing::instrument(skip(self))]
    pub async fn price_range(&self) -> Result<PriceRange, DomainError> {
        let products = self
            .store
            .query_products(&ProductQuery::new().sort(ProductSort::PriceAsc))
            .await
            .or_fail("Failed to load price range")?;

        let (Some(cheapest), Some(dearest)) = (products.first(), products.last()) else {
            return Ok(PriceRange::default());
        };
        Ok(PriceRange {
            min: cheapest.product.price.floor_dollars(),
            max: dearest.product.price.ceil_dollars(),
        })
    }

    async fn resolve_category(&self, category: &str) -> Result<Option<CategoryId>, DomainError> {
        if let Ok(category_id) = category.parse::<CategoryId>() {
            return Ok(Some(category_id));
        }

        let name = category.replace('-', " ");
        let found = self
            .store
            .find_category_by_name(&name)
            .await
            .or_fail("Failed to load products")?;
        if found.is_none() {
            tracing::debug!(slug = category, "unknown category slug");
        }
        Ok(found.map(|c| c.id))
    }
}

#[cfg(test)]
mod tests {
    use store::{InMemoryStore, Product};

    use super::*;

    async fn seeded() -> (CatalogService<InMemoryStore>, Category) {
        let store = InMemoryStore::new();
        let drinks = Category::new("Hot Drinks");
        store.insert_category(drinks.clone()).await.unwrap();

        let mut latte = Product::new("Latte", Money::from_cents(450)).in_category(drinks.id);
        latte.featured = true;
        latte.rating = 4.8;
        let mut mocha = Product::new("Mocha", Money::from_cents(525)).in_category(drinks.id);
        mocha.rating = 4.9;
        let mut muffin = Product::new("Blueberry Muffin", Money::from_cents(375))
            .with_description("Baked daily with latte glaze");
        muffin.rating = 4.1;
        let mut sold_out = Product::new("Seasonal Cake", Money::from_cents(900));
        sold_out.in_stock = false;

        for product in [latte, mocha, muffin, sold_out] {
            store.insert_product(product).await.unwrap();
        }
        (CatalogService::new(store), drinks)
    }

    #[tokio::test]
    async fn category_slug_resolves_case_insensitively() {
        let (catalog, _) = seeded().await;
        let filter = ProductFilter {
            category: Some("hot-drinks".to_string()),
            sort: Some(ProductSort::Name),
            ..Default::default()
        };

        let products = catalog.list_products(&filter).await.unwrap();
        let names: Vec<_> = products.iter().map(|p| p.product.name.as_str()).collect();
        assert_eq!(names, ["Latte", "Mocha"]);
    }

    #[tokio::test]
    async fn unknown_slug_matches_nothing() {
        let (catalog, _) = seeded().await;
        let filter = ProductFilter {
            category: Some("pastries".to_string()),
            ..Default::default()
        };
        assert!(catalog.list_products(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_id_filter() {
        let (catalog, drinks) = seeded().await;
        let filter = ProductFilter {
            category: Some(drinks.id.to_string()),
            max_price_cents: Some(500),
            ..Default::default()
        };

        let products = catalog.list_products(&filter).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product.name, "Latte");
    }

    #[tokio::test]
    async fn search_puts_featured_first() {
        let (catalog, _) = seeded().await;

        let products = catalog.search_products("latte").await.unwrap();
        let names: Vec<_> = products.iter().map(|p| p.product.name.as_str()).collect();
        assert_eq!(names, ["Latte", "Blueberry Muffin"]);
        assert!(catalog.search_products("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn featured_only_includes_featured() {
        let (catalog, _) = seeded().await;
        let products = catalog.featured_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert!(products[0].product.featured);
    }

    #[tokio::test]
    async fn price_range_ignores_out_of_stock() {
        let (catalog, _) = seeded().await;
        let range = catalog.price_range().await.unwrap();
        assert_eq!(range, PriceRange { min: 3, max: 6 });
    }

    #[tokio::test]
    async fn price_range_defaults_when_empty() {
        let catalog = CatalogService::new(InMemoryStore::new());
        assert_eq!(catalog.price_range().await.unwrap(), PriceRange::default());
    }
}
