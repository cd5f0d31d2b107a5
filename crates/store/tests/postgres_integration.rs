//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use store::{
    CartLineDelta, CartSnapshotEntry, Category, MAX_CART_QUANTITY, Money, NewOrder, NewOrderItem, OrderId,
    OrderStatus, PostgresStore, Product, ProductQuery, ProductSort, ProductVariant, ProductId,
    Store, StoreError, StoreExt, UserId,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let store = PostgresStore::connect(&info.connection_string, 5, Duration::from_secs(10))
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_items, orders, cart_items, product_variants, products, categories, sessions",
    )
    .execute(store.pool())
    .await
    .unwrap();

    store
}

async fn insert_product(store: &PostgresStore, name: &str, cents: i64) -> Product {
    let product = Product::new(name, Money::from_cents(cents));
    store.insert_product(product.clone()).await.unwrap();
    product
}

fn order_for(user_id: UserId, product: &Product, quantity: u32) -> NewOrder {
    let total = product.price.multiply(quantity);
    NewOrder {
        id: OrderId::new(),
        user_id,
        total_amount: total,
        delivery_address: serde_json::json!({ "street": "1 Main St" }),
        items: vec![NewOrderItem {
            product_id: product.id,
            variant_id: None,
            quantity,
            unit_price: product.price,
            total_price: total,
        }],
    }
}

#[tokio::test]
async fn upsert_merges_same_line() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let user = UserId::new();

    let first = store
        .upsert_cart_line(user, CartLineDelta::new(product.id, None, 2))
        .await
        .unwrap();
    let second = store
        .upsert_cart_line(user, CartLineDelta::new(product.id, None, 3))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 5);
    assert_eq!(store.cart_items(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn variants_are_separate_lines() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Latte", 450).await;
    let large = ProductVariant::new(product.id, "Large", Money::from_cents(75));
    store.insert_variant(large.clone()).await.unwrap();
    let user = UserId::new();

    store
        .upsert_cart_lines(
            user,
            &[
                CartLineDelta::new(product.id, None, 1),
                CartLineDelta::new(product.id, Some(large.id), 1),
                CartLineDelta::new(product.id, Some(large.id), 1),
            ],
        )
        .await
        .unwrap();

    let lines = store.list_cart_lines(user).await.unwrap();
    assert_eq!(lines.len(), 2);
    let sized = lines.iter().find(|l| l.variant.is_some()).unwrap();
    assert_eq!(sized.item.quantity, 2);
    assert_eq!(sized.variant.as_ref().unwrap().price_modifier.cents(), 75);
}

#[tokio::test]
async fn concurrent_upserts_never_duplicate_a_line() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let user = UserId::new();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert_cart_line(user, CartLineDelta::new(product.id, None, 1))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let items = store.cart_items(user).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 10);
}

#[tokio::test]
async fn upsert_of_unknown_product_writes_nothing() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let user = UserId::new();

    let result = store
        .upsert_cart_lines(
            user,
            &[
                CartLineDelta::new(product.id, None, 1),
                CartLineDelta::new(ProductId::new(), None, 1),
            ],
        )
        .await;

    assert!(matches!(result, Err(StoreError::MissingReference { .. })));
    assert!(store.cart_items(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn merge_past_quantity_limit_writes_nothing() {
    let store = get_test_store().await;
    let coffee = insert_product(&store, "Coffee", 1200).await;
    let tea = insert_product(&store, "Tea", 300).await;
    let user = UserId::new();
    store
        .upsert_cart_line(user, CartLineDelta::new(coffee.id, None, MAX_CART_QUANTITY))
        .await
        .unwrap();

    let merge = store
        .upsert_cart_lines(
            user,
            &[
                CartLineDelta::new(tea.id, None, 1),
                CartLineDelta::new(coffee.id, None, 1),
            ],
        )
        .await;
    assert!(matches!(merge, Err(StoreError::QuantityLimit { .. })));

    let oversized = store
        .upsert_cart_line(user, CartLineDelta::new(tea.id, None, u32::MAX))
        .await;
    assert!(matches!(oversized, Err(StoreError::QuantityLimit { .. })));

    let items = store.cart_items(user).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, MAX_CART_QUANTITY);
}

#[tokio::test]
async fn cart_writes_are_scoped_to_owner() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let alice = UserId::new();
    let bob = UserId::new();
    let item = store
        .upsert_cart_line(alice, CartLineDelta::new(product.id, None, 1))
        .await
        .unwrap();

    assert!(!store.set_cart_item_quantity(bob, item.id, 9).await.unwrap());
    assert!(!store.delete_cart_item(bob, item.id).await.unwrap());
    assert_eq!(store.clear_cart(bob).await.unwrap(), 0);

    assert!(store.set_cart_item_quantity(alice, item.id, 4).await.unwrap());
    let fetched = store.get_cart_item(item.id).await.unwrap().unwrap();
    assert_eq!(fetched.quantity, 4);
}

#[tokio::test]
async fn place_order_consumes_priced_lines() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let user = UserId::new();
    let item = store
        .upsert_cart_line(user, CartLineDelta::new(product.id, None, 2))
        .await
        .unwrap();
    let snapshot = [CartSnapshotEntry {
        cart_item_id: item.id,
        quantity: 2,
    }];

    let order = store
        .place_order(order_for(user, &product, 2), &snapshot)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount.cents(), 2400);
    assert!(store.cart_items(user).await.unwrap().is_empty());

    let details = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(details.order_items.len(), 1);
    assert_eq!(details.order_items[0].item.unit_price.cents(), 1200);
    assert_eq!(
        details.order_items[0].product.as_ref().map(|p| p.name.as_str()),
        Some("Coffee")
    );
}

#[tokio::test]
async fn stale_snapshot_writes_nothing() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let user = UserId::new();
    let item = store
        .upsert_cart_line(user, CartLineDelta::new(product.id, None, 2))
        .await
        .unwrap();
    store
        .upsert_cart_line(user, CartLineDelta::new(product.id, None, 1))
        .await
        .unwrap();

    let stale = [CartSnapshotEntry {
        cart_item_id: item.id,
        quantity: 2,
    }];
    let result = store.place_order(order_for(user, &product, 2), &stale).await;

    assert!(matches!(result, Err(StoreError::CartChanged { .. })));
    assert!(store.list_orders(user).await.unwrap().is_empty());
    assert_eq!(store.cart_items(user).await.unwrap()[0].quantity, 3);
}

#[tokio::test]
async fn order_prices_survive_catalog_changes() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let user = UserId::new();
    let item = store
        .upsert_cart_line(user, CartLineDelta::new(product.id, None, 1))
        .await
        .unwrap();
    let order = store
        .place_order(
            order_for(user, &product, 1),
            &[CartSnapshotEntry {
                cart_item_id: item.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();

    store
        .update_product_price(product.id, Money::from_cents(1999))
        .await
        .unwrap();

    let details = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(details.order.total_amount.cents(), 1200);
    assert_eq!(details.order_items[0].item.total_price.cents(), 1200);
}

#[tokio::test]
async fn status_update_is_compare_and_set() {
    let store = get_test_store().await;
    let product = insert_product(&store, "Coffee", 1200).await;
    let user = UserId::new();
    let item = store
        .upsert_cart_line(user, CartLineDelta::new(product.id, None, 1))
        .await
        .unwrap();
    let order = store
        .place_order(
            order_for(user, &product, 1),
            &[CartSnapshotEntry {
                cart_item_id: item.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();

    let confirmed = store
        .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);

    let conflict = store
        .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await;
    assert!(matches!(
        conflict,
        Err(StoreError::StatusConflict {
            actual: OrderStatus::Confirmed,
            ..
        })
    ));

    let missing = store
        .update_order_status(OrderId::new(), OrderStatus::Pending, OrderStatus::Cancelled)
        .await;
    assert!(matches!(missing, Err(StoreError::RowNotFound { .. })));
}

#[tokio::test]
async fn sessions_resolve_until_revoked() {
    let store = get_test_store().await;
    let user = UserId::new();

    let token = store
        .create_session(user, Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(store.resolve_session(&token).await.unwrap(), Some(user));

    store.revoke_session(&token).await.unwrap();
    assert_eq!(store.resolve_session(&token).await.unwrap(), None);

    let expired = store.create_session(user, Duration::ZERO).await.unwrap();
    assert_eq!(store.resolve_session(&expired).await.unwrap(), None);
}

#[tokio::test]
async fn product_query_filters_and_sorts() {
    let store = get_test_store().await;
    let drinks = Category::new("Hot Drinks");
    store.insert_category(drinks.clone()).await.unwrap();

    let latte = Product::new("Latte", Money::from_cents(450)).in_category(drinks.id);
    let mocha = Product::new("Mocha", Money::from_cents(525)).in_category(drinks.id);
    let mut muffin = Product::new("Muffin", Money::from_cents(375))
        .with_description("Pairs well with a 50% latte");
    muffin.in_stock = false;
    for product in [latte, mocha, muffin] {
        store.insert_product(product).await.unwrap();
    }

    let by_price = store
        .query_products(
            &ProductQuery::new()
                .category(drinks.id)
                .sort(ProductSort::PriceDesc),
        )
        .await
        .unwrap();
    let names: Vec<_> = by_price.iter().map(|p| p.product.name.as_str()).collect();
    assert_eq!(names, ["Mocha", "Latte"]);
    assert_eq!(
        by_price[0].category.as_ref().map(|c| c.name.as_str()),
        Some("Hot Drinks")
    );

    let search = store
        .query_products(&ProductQuery::new().search("50%").include_out_of_stock())
        .await
        .unwrap();
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].product.name, "Muffin");

    let found = store.find_category_by_name("hot drinks").await.unwrap();
    assert_eq!(found.map(|c| c.id), Some(drinks.id));
}
