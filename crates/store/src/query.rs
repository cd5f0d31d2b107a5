use serde::{Deserialize, Serialize};

use crate::{CategoryId, Money, Product};

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Featured products first, then newest.
    #[default]
    Featured,
    Name,
    PriceAsc,
    PriceDesc,
    /// Highest rated first.
    Rating,
    Newest,
}

impl ProductSort {
    /// Orders two products according to this sort.
    pub fn compare(&self, a: &Product, b: &Product) -> std::cmp::Ordering {
        match self {
            ProductSort::Featured => b
                .featured
                .cmp(&a.featured)
                .then(b.created_at.cmp(&a.created_at)),
            ProductSort::Name => a.name.cmp(&b.name),
            ProductSort::PriceAsc => a.price.cmp(&b.price),
            ProductSort::PriceDesc => b.price.cmp(&a.price),
            ProductSort::Rating => b.rating.total_cmp(&a.rating),
            ProductSort::Newest => b.created_at.cmp(&a.created_at),
        }
    }

    /// The SQL `ORDER BY` clause for this sort.
    pub fn order_by(&self) -> &'static str {
        match self {
            ProductSort::Featured => "featured DESC, created_at DESC",
            ProductSort::Name => "name ASC",
            ProductSort::PriceAsc => "price_cents ASC",
            ProductSort::PriceDesc => "price_cents DESC",
            ProductSort::Rating => "rating DESC",
            ProductSort::Newest => "created_at DESC",
        }
    }
}

/// Builder for constructing product queries.
///
/// Allows filtering products by category, free-text search, price and
/// rating bounds, and the featured flag. Out-of-stock products are excluded
/// unless asked for.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    /// Filter by category.
    pub category_id: Option<CategoryId>,

    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,

    /// Minimum price (inclusive).
    pub min_price: Option<Money>,

    /// Maximum price (inclusive).
    pub max_price: Option<Money>,

    /// Minimum rating (inclusive).
    pub min_rating: Option<f64>,

    /// Filter by the featured flag.
    pub featured: Option<bool>,

    /// Exclude products that are out of stock.
    pub in_stock_only: bool,

    pub sort: ProductSort,

    /// Maximum number of products to return.
    pub limit: Option<usize>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category_id: None,
            search: None,
            min_price: None,
            max_price: None,
            min_rating: None,
            featured: None,
            in_stock_only: true,
            sort: ProductSort::default(),
            limit: None,
        }
    }
}

impl ProductQuery {
    /// Creates a query for all in-stock products.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn min_rating(mut self, rating: f64) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    /// Includes out-of-stock products.
    pub fn include_out_of_stock(mut self) -> Self {
        self.in_stock_only = false;
        self
    }

    pub fn sort(mut self, sort: ProductSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the product passes every filter of this query.
    pub fn matches(&self, product: &Product) -> bool {
        if self.in_stock_only && !product.in_stock {
            return false;
        }
        if let Some(category_id) = self.category_id
            && product.category_id != Some(category_id)
        {
            return false;
        }
        if let Some(ref term) = self.search {
            let term = term.to_lowercase();
            let in_name = product.name.to_lowercase().contains(&term);
            let in_description = product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(min) = self.min_price
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }
        if let Some(min) = self.min_rating
            && product.rating < min
        {
            return false;
        }
        if let Some(featured) = self.featured
            && product.featured != featured
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, cents: i64) -> Product {
        Product::new(name, Money::from_cents(cents))
    }

    #[test]
    fn default_query_hides_out_of_stock() {
        let mut sold_out = product("Scone", 300);
        sold_out.in_stock = false;

        assert!(!ProductQuery::new().matches(&sold_out));
        assert!(ProductQuery::new().include_out_of_stock().matches(&sold_out));
    }

    #[test]
    fn search_matches_name_or_description_case_insensitively() {
        let latte = product("Vanilla Latte", 550).with_description("Espresso and milk");
        assert!(ProductQuery::new().search("latte").matches(&latte));
        assert!(ProductQuery::new().search("ESPRESSO").matches(&latte));
        assert!(!ProductQuery::new().search("mocha").matches(&latte));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let muffin = product("Muffin", 400);
        let query = ProductQuery::new()
            .min_price(Money::from_cents(400))
            .max_price(Money::from_cents(400));
        assert!(query.matches(&muffin));
        assert!(!ProductQuery::new().min_price(Money::from_cents(401)).matches(&muffin));
    }

    #[test]
    fn category_and_featured_filters() {
        let category = CategoryId::new();
        let mut coffee = product("Coffee", 1200).in_category(category);
        coffee.featured = true;

        assert!(ProductQuery::new().category(category).matches(&coffee));
        assert!(!ProductQuery::new().category(CategoryId::new()).matches(&coffee));
        assert!(ProductQuery::new().featured(true).matches(&coffee));
        assert!(!ProductQuery::new().featured(false).matches(&coffee));
    }

    #[test]
    fn sort_by_price_and_featured() {
        let cheap = product("Tea", 300);
        let mut pricey = product("Cake", 900);
        pricey.featured = true;

        let mut products = vec![pricey.clone(), cheap.clone()];
        products.sort_by(|a, b| ProductSort::PriceAsc.compare(a, b));
        assert_eq!(products[0].name, "Tea");

        products.sort_by(|a, b| ProductSort::Featured.compare(a, b));
        assert_eq!(products[0].name, "Cake");
    }
}
