use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use modern_mart_api::{
    db::{DbPool, run_migrations},
    dto::{
        cart::AddToCartRequest,
        orders::{CreateOrderRequest, OrderItemInput},
        wishlist::AddToWishlistRequest,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::ProductQuery,
    routes::{recently_visited, reviews},
    services::{cart_service, order_service, product_service, wishlist_service},
};

async fn setup_pool() -> anyhow::Result<DbPool> {
    // A single connection keeps the in-memory database alive for the test.
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn create_user(pool: &DbPool, email: &str) -> anyhow::Result<AuthUser> {
    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, phone)
        VALUES ($1, 'unused-in-this-test', 'Test', 'Shopper', '+91 9000000001')
        RETURNING id
        "#,
    )
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(AuthUser { user_id })
}

struct ProductSpec<'a> {
    slug: &'a str,
    price: i64,
    original_price: Option<i64>,
    featured: bool,
}

async fn create_product(pool: &DbPool, spec: ProductSpec<'_>) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO products (slug, name, description, price, original_price,
                              stock_quantity, size_chart, featured)
        VALUES ($1, $2, $3, $4, $5, 10, 's,m,l', $6)
        RETURNING id
        "#,
    )
    .bind(spec.slug)
    .bind(format!("Product {}", spec.slug))
    .bind("A product for testing")
    .bind(spec.price)
    .bind(spec.original_price)
    .bind(spec.featured)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[tokio::test]
async fn cart_summary_crosses_free_shipping_threshold() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let user = create_user(&pool, "cart@example.com").await?;
    let shirt = create_product(
        &pool,
        ProductSpec {
            slug: "shirt",
            price: 450,
            original_price: None,
            featured: false,
        },
    )
    .await?;
    let tie = create_product(
        &pool,
        ProductSpec {
            slug: "tie",
            price: 200,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            product_id: shirt,
            quantity: Some(2),
        },
    )
    .await?;

    let cart = cart_service::list_cart(&pool, &user).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].total_price, 900);
    assert_eq!(cart.summary.subtotal, 900);
    assert_eq!(cart.summary.discount, 0);
    assert_eq!(cart.summary.shipping, 50);
    assert_eq!(cart.summary.tax, 50);
    assert_eq!(cart.summary.total, 1000);
    assert!(!cart.summary.free_shipping_eligible);

    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            product_id: tie,
            quantity: None,
        },
    )
    .await?;

    let cart = cart_service::list_cart(&pool, &user).await?.data.unwrap();
    let line_sum: i64 = cart.items.iter().map(|item| item.total_price).sum();
    assert_eq!(cart.summary.subtotal, line_sum);
    assert_eq!(cart.summary.subtotal, 1100);
    assert_eq!(cart.summary.shipping, 0);
    assert_eq!(cart.summary.total, 1150);
    assert!(cart.summary.free_shipping_eligible);

    Ok(())
}

#[tokio::test]
async fn adding_same_product_bumps_quantity() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let user = create_user(&pool, "bump@example.com").await?;
    let product = create_product(
        &pool,
        ProductSpec {
            slug: "shirt",
            price: 450,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: Some(1),
        },
    )
    .await?;
    let item = cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: Some(2),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(item.quantity, 3);

    let count = cart_service::cart_count(&pool, &user).await?.data.unwrap();
    assert_eq!(count.count, 1);

    let err = cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            product_id: 9999,
            quantity: Some(1),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn zero_quantity_update_removes_the_row() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let user = create_user(&pool, "zero@example.com").await?;
    let product = create_product(
        &pool,
        ProductSpec {
            slug: "shirt",
            price: 450,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    let item = cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: Some(2),
        },
    )
    .await?
    .data
    .unwrap();

    cart_service::update_cart_item(&pool, &user, item.id, 0).await?;
    let cart = cart_service::list_cart(&pool, &user).await?.data.unwrap();
    assert!(cart.items.is_empty());

    let err = cart_service::update_cart_item(&pool, &user, item.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = cart_service::update_cart_item(&pool, &user, item.id, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn order_placement_is_all_or_nothing() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let user = create_user(&pool, "orders@example.com").await?;
    let product = create_product(
        &pool,
        ProductSpec {
            slug: "shirt",
            price: 450,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    // Second item references a missing product; the FK failure mid-loop must
    // roll back the order row inserted before it.
    let err = order_service::create_order(
        &pool,
        &user,
        CreateOrderRequest {
            items: vec![
                OrderItemInput {
                    product_id: product,
                    quantity: 1,
                    price: 450,
                },
                OrderItemInput {
                    product_id: 9999,
                    quantity: 1,
                    price: 100,
                },
            ],
            shipping_address: Some("42 MG Road, Bengaluru".into()),
            payment_method: Some("cod".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::DbError(_)));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await?;
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(&pool)
        .await?;
    assert_eq!(orders, 0);
    assert_eq!(items, 0);

    // A valid order inserts the order and every item.
    let created = order_service::create_order(
        &pool,
        &user,
        CreateOrderRequest {
            items: vec![OrderItemInput {
                product_id: product,
                quantity: 2,
                price: 450,
            }],
            shipping_address: Some("42 MG Road, Bengaluru".into()),
            payment_method: Some("card".into()),
        },
    )
    .await?
    .data
    .unwrap();

    let fetched = order_service::get_order(&pool, &user, created.order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.order.status, "Pending");
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].quantity, 2);

    let listed = order_service::list_orders(&pool, &user).await?.data.unwrap();
    assert_eq!(listed.items.len(), 1);

    let err = order_service::create_order(
        &pool,
        &user,
        CreateOrderRequest {
            items: vec![],
            shipping_address: None,
            payment_method: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn wishlist_toggle_add_and_conflict() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let user = create_user(&pool, "wish@example.com").await?;
    let product = create_product(
        &pool,
        ProductSpec {
            slug: "watch",
            price: 2499,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    let toggled = wishlist_service::toggle_wishlist(&pool, &user, product)
        .await?
        .data
        .unwrap();
    assert!(toggled.added);

    let err = wishlist_service::add_to_wishlist(
        &pool,
        &user,
        AddToWishlistRequest {
            product_id: product,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let toggled = wishlist_service::toggle_wishlist(&pool, &user, product)
        .await?
        .data
        .unwrap();
    assert!(!toggled.added);

    let err = wishlist_service::remove_from_wishlist(&pool, &user, product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let count = wishlist_service::wishlist_count(&pool, &user)
        .await?
        .data
        .unwrap();
    assert_eq!(count.count, 0);

    Ok(())
}

#[tokio::test]
async fn catalog_filters_and_derived_fields() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    create_product(
        &pool,
        ProductSpec {
            slug: "featured-shirt",
            price: 750,
            original_price: Some(1000),
            featured: true,
        },
    )
    .await?;
    create_product(
        &pool,
        ProductSpec {
            slug: "plain-tie",
            price: 499,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    let page = product_service::list_products(
        &pool,
        ProductQuery {
            featured: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].slug, "featured-shirt");
    assert_eq!(page.products[0].discount_percentage, 25);
    assert_eq!(page.products[0].size_chart, vec!["s", "m", "l"]);

    let page = product_service::list_products(
        &pool,
        ProductQuery {
            discount: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].slug, "featured-shirt");

    let results = product_service::search_products(&pool, "plain-tie")
        .await?
        .data
        .unwrap();
    assert_eq!(results.items.len(), 1);
    assert_eq!(results.items[0].discount_percentage, 0);

    let err = product_service::get_product_by_slug(&pool, "no-such-slug")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn review_rating_bounds_and_aggregates() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let user = create_user(&pool, "review@example.com").await?;
    create_product(
        &pool,
        ProductSpec {
            slug: "oxfords",
            price: 1999,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    let err = reviews::create_review(
        State(pool.clone()),
        user.clone(),
        Path("oxfords".to_string()),
        Json(reviews::CreateReviewRequest {
            rating: 6,
            comment: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    reviews::create_review(
        State(pool.clone()),
        user.clone(),
        Path("oxfords".to_string()),
        Json(reviews::CreateReviewRequest {
            rating: 4,
            comment: Some("Sharp looking".into()),
        }),
    )
    .await?;
    reviews::create_review(
        State(pool.clone()),
        user.clone(),
        Path("oxfords".to_string()),
        Json(reviews::CreateReviewRequest {
            rating: 5,
            comment: None,
        }),
    )
    .await?;

    let listed = reviews::list_reviews(State(pool.clone()), Path("oxfords".to_string()))
        .await?
        .0
        .data
        .unwrap();
    assert_eq!(listed.items.len(), 2);

    let product = product_service::get_product_by_slug(&pool, "oxfords")
        .await?
        .data
        .unwrap();
    assert_eq!(product.review_count, 2);
    assert_eq!(product.average_rating, 4.5);

    Ok(())
}

#[tokio::test]
async fn revisiting_a_product_keeps_one_row() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let user = create_user(&pool, "recent@example.com").await?;
    let product = create_product(
        &pool,
        ProductSpec {
            slug: "bag",
            price: 2799,
            original_price: None,
            featured: false,
        },
    )
    .await?;

    recently_visited::record_visit(State(pool.clone()), user.clone(), Path(product)).await?;
    recently_visited::record_visit(State(pool.clone()), user.clone(), Path(product)).await?;

    let listed = recently_visited::list_recently_visited(State(pool.clone()), user.clone())
        .await?
        .0
        .data
        .unwrap();
    assert_eq!(listed.items.len(), 1);

    let err = recently_visited::record_visit(State(pool.clone()), user.clone(), Path(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}
