use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::{
    db::DbPool,
    dto::products::{CatalogFilters, CatalogPage, ProductDto, ProductList},
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
};

/// Sizes are a fixed set; the catalog has no size table.
const SIZES: [&str; 6] = ["xs", "s", "m", "l", "xl", "xxl"];

/// Product row joined with category/brand names, primary image, and review
/// aggregates. Every lookup goes through this shape so derived fields are
/// computed in one place.
const PRODUCT_SELECT: &str = r#"
SELECT p.id, p.slug, p.name, p.description, p.price, p.original_price,
       p.stock_quantity, p.category_id, p.brand_id, p.size_chart, p.featured,
       p.created_at,
       c.name AS category_name,
       b.name AS brand_name,
       (SELECT pi.image_url FROM product_images pi
        WHERE pi.product_id = p.id ORDER BY pi.id LIMIT 1) AS primary_image,
       (SELECT AVG(r.rating) FROM reviews r WHERE r.product_id = p.id) AS average_rating,
       (SELECT COUNT(*) FROM reviews r WHERE r.product_id = p.id) AS review_count
FROM products p
LEFT JOIN categories c ON c.id = p.category_id
LEFT JOIN brands b ON b.id = p.brand_id
"#;

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    slug: String,
    name: String,
    description: Option<String>,
    price: i64,
    original_price: Option<i64>,
    stock_quantity: i32,
    category_id: Option<i64>,
    brand_id: Option<i64>,
    size_chart: Option<String>,
    featured: bool,
    created_at: DateTime<Utc>,
    category_name: Option<String>,
    brand_name: Option<String>,
    primary_image: Option<String>,
    average_rating: Option<f64>,
    review_count: i64,
}

pub async fn list_products(
    pool: &DbPool,
    query: ProductQuery,
) -> AppResult<ApiResponse<CatalogPage>> {
    let (page, per_page, offset) = query.pagination().normalize();

    let mut finder = QueryBuilder::<Sqlite>::new(PRODUCT_SELECT);
    push_filters(&mut finder, &query);

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder.push(" ORDER BY ");
    finder.push(sort_by.as_sql());
    finder.push(" ");
    finder.push(sort_order.as_sql());
    finder.push(" LIMIT ");
    finder.push_bind(per_page);
    finder.push(" OFFSET ");
    finder.push_bind(offset);

    let rows: Vec<ProductRow> = finder.build_query_as().fetch_all(pool).await?;

    let mut counter = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT COUNT(*)
        FROM products p
        LEFT JOIN categories c ON c.id = p.category_id
        LEFT JOIN brands b ON b.id = p.brand_id
        "#,
    );
    push_filters(&mut counter, &query);
    let total: i64 = counter.build_query_scalar().fetch_one(pool).await?;

    let products = rows.into_iter().map(to_dto).collect();
    let filters = catalog_filters(pool).await?;

    let meta = Meta::new(page, per_page, total);
    Ok(ApiResponse::success(
        "Products",
        CatalogPage { products, filters },
        Some(meta),
    ))
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ProductQuery) {
    builder.push(" WHERE 1=1");

    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(" AND (p.name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.description LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        builder.push(" AND c.name = ");
        builder.push_bind(category.clone());
    }
    if let Some(brand) = query.brand.as_ref().filter(|s| !s.is_empty()) {
        builder.push(" AND b.name = ");
        builder.push_bind(brand.clone());
    }
    if query.discount == Some(true) {
        builder.push(" AND p.original_price IS NOT NULL AND p.original_price > p.price");
    }
    if query.featured == Some(true) {
        builder.push(" AND p.featured = 1");
    }
}

async fn catalog_filters(pool: &DbPool) -> AppResult<CatalogFilters> {
    let categories: Vec<String> = sqlx::query_scalar("SELECT name FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    let brands: Vec<String> = sqlx::query_scalar("SELECT name FROM brands ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(CatalogFilters {
        categories,
        brands,
        sizes: SIZES.iter().map(|s| s.to_string()).collect(),
    })
}

pub async fn get_product(pool: &DbPool, id: i64) -> AppResult<ApiResponse<ProductDto>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let row = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", to_dto(row), None))
}

pub async fn get_product_by_slug(pool: &DbPool, slug: &str) -> AppResult<ApiResponse<ProductDto>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.slug = $1"))
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    let row = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", to_dto(row), None))
}

pub async fn list_by_category(
    pool: &DbPool,
    category: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "{PRODUCT_SELECT} WHERE c.name = $1 ORDER BY p.created_at DESC"
    ))
    .bind(category)
    .fetch_all(pool)
    .await?;

    let items = rows.into_iter().map(to_dto).collect();
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn search_products(pool: &DbPool, q: &str) -> AppResult<ApiResponse<ProductList>> {
    let pattern = format!("%{q}%");
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "{PRODUCT_SELECT} WHERE p.name LIKE $1 OR p.description LIKE $1 ORDER BY p.created_at DESC"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    let items = rows.into_iter().map(to_dto).collect();
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

fn to_dto(row: ProductRow) -> ProductDto {
    ProductDto {
        discount_percentage: discount_percentage(row.price, row.original_price),
        size_chart: parse_size_chart(row.size_chart.as_deref()),
        average_rating: row
            .average_rating
            .map(|avg| (avg * 100.0).round() / 100.0)
            .unwrap_or(0.0),
        id: row.id,
        slug: row.slug,
        name: row.name,
        description: row.description,
        price: row.price,
        original_price: row.original_price,
        stock_quantity: row.stock_quantity,
        category_id: row.category_id,
        category_name: row.category_name,
        brand_id: row.brand_id,
        brand_name: row.brand_name,
        featured: row.featured,
        primary_image: row.primary_image,
        review_count: row.review_count,
        created_at: row.created_at,
    }
}

/// Percentage markdown from `original_price` to `price`, rounded to the
/// nearest whole percent. Zero when there is no (positive) original price.
pub fn discount_percentage(price: i64, original_price: Option<i64>) -> i64 {
    match original_price {
        Some(original) if original > 0 => {
            (((original - price) as f64 / original as f64) * 100.0).round() as i64
        }
        _ => 0,
    }
}

/// `size_chart` is stored as a comma-separated list.
pub fn parse_size_chart(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_rounds_to_whole_percent() {
        assert_eq!(discount_percentage(750, Some(1000)), 25);
        assert_eq!(discount_percentage(667, Some(1000)), 33);
        assert_eq!(discount_percentage(1000, Some(1000)), 0);
        assert_eq!(discount_percentage(500, None), 0);
        assert_eq!(discount_percentage(500, Some(0)), 0);
    }

    #[test]
    fn size_chart_parses_and_trims() {
        assert_eq!(parse_size_chart(Some("s, m ,l")), vec!["s", "m", "l"]);
        assert_eq!(parse_size_chart(Some("")), Vec::<String>::new());
        assert_eq!(parse_size_chart(None), Vec::<String>::new());
    }
}
