use modern_mart_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    services::auth_service,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_path).await?;
    run_migrations(&pool).await?;

    seed_categories(&pool).await?;
    seed_brands(&pool).await?;
    seed_products(&pool).await?;
    let user_id = ensure_user(&pool, "demo@modernmart.com", "demo1234").await?;

    println!("Seed completed. Demo user ID: {user_id}");
    Ok(())
}

async fn ensure_user(pool: &DbPool, email: &str, password: &str) -> anyhow::Result<i64> {
    let password_hash = auth_service::hash_password(password)?;

    sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, phone)
        VALUES ($1, $2, 'Demo', 'Shopper', '+91 9000000000')
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .execute(pool)
    .await?;

    let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn seed_categories(pool: &DbPool) -> anyhow::Result<()> {
    let categories = [
        ("Shirts", "Formal shirts for interviews"),
        ("Pants", "Formal trousers"),
        ("Ties", "Ties and pocket squares"),
        ("Watches", "Dress watches"),
        ("Bags", "Laptop and messenger bags"),
        ("Shoes", "Formal shoes"),
    ];

    for (name, description) in categories {
        sqlx::query(
            "INSERT INTO categories (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories");
    Ok(())
}

async fn seed_brands(pool: &DbPool) -> anyhow::Result<()> {
    let brands = [
        ("Apex Formals", "Classic formal wear"),
        ("Meridian", "Accessories and watches"),
        ("Northway", "Bags and leather goods"),
    ];

    for (name, description) in brands {
        sqlx::query(
            "INSERT INTO brands (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    println!("Seeded brands");
    Ok(())
}

struct SeedProduct {
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    price: i64,
    original_price: Option<i64>,
    stock_quantity: i32,
    category: &'static str,
    brand: &'static str,
    size_chart: Option<&'static str>,
    featured: bool,
    image_url: &'static str,
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let products = [
        SeedProduct {
            slug: "classic-white-shirt",
            name: "Classic White Shirt",
            description: "Crisp cotton shirt for interviews",
            price: 899,
            original_price: Some(1199),
            stock_quantity: 50,
            category: "Shirts",
            brand: "Apex Formals",
            size_chart: Some("s,m,l,xl"),
            featured: true,
            image_url: "/api/images/classic-white-shirt.jpg",
        },
        SeedProduct {
            slug: "charcoal-trousers",
            name: "Charcoal Trousers",
            description: "Slim-fit formal trousers",
            price: 1299,
            original_price: None,
            stock_quantity: 40,
            category: "Pants",
            brand: "Apex Formals",
            size_chart: Some("s,m,l,xl,xxl"),
            featured: false,
            image_url: "/api/images/charcoal-trousers.jpg",
        },
        SeedProduct {
            slug: "silk-navy-tie",
            name: "Silk Navy Tie",
            description: "Handmade silk tie",
            price: 499,
            original_price: Some(699),
            stock_quantity: 120,
            category: "Ties",
            brand: "Meridian",
            size_chart: None,
            featured: true,
            image_url: "/api/images/silk-navy-tie.jpg",
        },
        SeedProduct {
            slug: "minimal-dress-watch",
            name: "Minimal Dress Watch",
            description: "Slim quartz watch with leather strap",
            price: 2499,
            original_price: Some(2999),
            stock_quantity: 25,
            category: "Watches",
            brand: "Meridian",
            size_chart: None,
            featured: false,
            image_url: "/api/images/minimal-dress-watch.jpg",
        },
        SeedProduct {
            slug: "leather-laptop-bag",
            name: "Leather Laptop Bag",
            description: "Fits a 15-inch laptop",
            price: 2799,
            original_price: None,
            stock_quantity: 15,
            category: "Bags",
            brand: "Northway",
            size_chart: None,
            featured: true,
            image_url: "/api/images/leather-laptop-bag.jpg",
        },
        SeedProduct {
            slug: "oxford-black-shoes",
            name: "Oxford Black Shoes",
            description: "Polished leather oxfords",
            price: 1999,
            original_price: Some(2499),
            stock_quantity: 30,
            category: "Shoes",
            brand: "Apex Formals",
            size_chart: Some("7,8,9,10,11"),
            featured: false,
            image_url: "/api/images/oxford-black-shoes.jpg",
        },
    ];

    for product in products {
        let category_id: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE name = $1")
            .bind(product.category)
            .fetch_optional(pool)
            .await?;
        let brand_id: Option<i64> = sqlx::query_scalar("SELECT id FROM brands WHERE name = $1")
            .bind(product.brand)
            .fetch_optional(pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO products
                (slug, name, description, price, original_price, stock_quantity,
                 category_id, brand_id, size_chart, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(product.slug)
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.stock_quantity)
        .bind(category_id)
        .bind(brand_id)
        .bind(product.size_chart)
        .bind(product.featured)
        .execute(pool)
        .await?;

        let product_id: i64 = sqlx::query_scalar("SELECT id FROM products WHERE slug = $1")
            .bind(product.slug)
            .fetch_one(pool)
            .await?;

        let has_image: Option<i64> =
            sqlx::query_scalar("SELECT id FROM product_images WHERE product_id = $1 LIMIT 1")
                .bind(product_id)
                .fetch_optional(pool)
                .await?;
        if has_image.is_none() {
            sqlx::query("INSERT INTO product_images (product_id, image_url) VALUES ($1, $2)")
                .bind(product_id)
                .bind(product.image_url)
                .execute(pool)
                .await?;
        }
    }

    println!("Seeded products");
    Ok(())
}
