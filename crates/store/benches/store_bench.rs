use criterion::{Criterion, criterion_group, criterion_main};
use store::{
    CartLineDelta, CartSnapshotEntry, InMemoryStore, Money, NewOrder, NewOrderItem, OrderId,
    Product, ProductQuery, ProductSort, Store, StoreExt, UserId,
};

fn bench_upsert_cart_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let product = Product::new("Coffee", Money::from_cents(1200));
    let user = UserId::new();
    rt.block_on(async { store.insert_product(product.clone()).await.unwrap() });

    c.bench_function("store/upsert_cart_line_merge", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .upsert_cart_line(user, CartLineDelta::new(product.id, None, 1))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let product = Product::new("Coffee", Money::from_cents(1200));
    rt.block_on(async { store.insert_product(product.clone()).await.unwrap() });

    c.bench_function("store/place_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                let user = UserId::new();
                let item = store
                    .upsert_cart_line(user, CartLineDelta::new(product.id, None, 2))
                    .await
                    .unwrap();
                let order = NewOrder {
                    id: OrderId::new(),
                    user_id: user,
                    total_amount: Money::from_cents(2400),
                    delivery_address: serde_json::Value::Null,
                    items: vec![NewOrderItem {
                        product_id: product.id,
                        variant_id: None,
                        quantity: 2,
                        unit_price: product.price,
                        total_price: Money::from_cents(2400),
                    }],
                };
                let snapshot = [CartSnapshotEntry {
                    cart_item_id: item.id,
                    quantity: 2,
                }];
                store.place_order(order, &snapshot).await.unwrap();
            });
        });
    });
}

fn bench_query_products(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    rt.block_on(async {
        for i in 0..500 {
            let product = Product::new(format!("Product {i}"), Money::from_cents(100 + i));
            store.insert_product(product).await.unwrap();
        }
    });
    let query = ProductQuery::new()
        .search("product 1")
        .sort(ProductSort::PriceDesc)
        .limit(20);

    c.bench_function("store/query_products_500", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.query_products(&query).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_upsert_cart_line,
    bench_place_order,
    bench_query_products
);
criterion_main!(benches);
