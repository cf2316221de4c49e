use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, RegisterRequest, TokenResponse, UserProfile, VerifyOtpRequest},
        cart::{
            AddToCartRequest, CartCount, CartItemDto, CartResponse, CartSummary,
            UpdateCartItemRequest,
        },
        orders::{
            CreateOrderRequest, OrderCreated, OrderItemDto, OrderItemInput, OrderList,
            OrderWithItems,
        },
        products::{CatalogFilters, CatalogPage, ProductDto, ProductList},
        wishlist::{
            AddToWishlistRequest, ToggleOutcome, WishlistCount, WishlistItemDto, WishlistList,
        },
    },
    models::{CartItem, Category, Order, Review},
    response::{ApiResponse, Meta},
    routes::{
        auth, cart, categories, chatbot, contact, health, orders, params, products, profile,
        recently_visited, reviews, users, wishlist,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("opaque")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::verify_otp,
        auth::me,
        products::list_products,
        products::search_products,
        products::get_product_by_slug,
        products::list_by_category,
        products::get_product,
        categories::list_categories,
        categories::get_category,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        cart::cart_count,
        wishlist::wishlist,
        wishlist::toggle_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::clear_wishlist,
        wishlist::wishlist_count,
        orders::list_orders,
        orders::get_order,
        orders::create_order,
        reviews::list_reviews,
        reviews::create_review,
        profile::update_profile,
        profile::upload_avatar,
        profile::delete_profile,
        users::user_stats,
        recently_visited::list_recently_visited,
        recently_visited::record_visit,
        chatbot::chat_response,
        contact::submit_contact
    ),
    components(
        schemas(
            health::HealthData,
            RegisterRequest,
            LoginRequest,
            VerifyOtpRequest,
            TokenResponse,
            UserProfile,
            ProductDto,
            ProductList,
            CatalogFilters,
            CatalogPage,
            Category,
            CartItem,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartSummary,
            CartResponse,
            CartCount,
            AddToWishlistRequest,
            WishlistItemDto,
            WishlistList,
            WishlistCount,
            ToggleOutcome,
            Order,
            OrderItemInput,
            CreateOrderRequest,
            OrderCreated,
            OrderItemDto,
            OrderWithItems,
            OrderList,
            Review,
            reviews::CreateReviewRequest,
            reviews::ReviewDto,
            reviews::ReviewList,
            profile::UpdateProfileRequest,
            users::UserStats,
            recently_visited::RecentlyVisitedDto,
            recently_visited::RecentlyVisitedList,
            chatbot::ChatRequest,
            chatbot::ChatReply,
            contact::ContactRequest,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<ProductDto>,
            ApiResponse<CatalogPage>,
            ApiResponse<CartResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<UserProfile>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login, OTP verification"),
        (name = "Products", description = "Catalog browsing and search"),
        (name = "Categories", description = "Category lookups"),
        (name = "Cart", description = "Cart contents and price summary"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Orders", description = "Order history and placement"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Profile", description = "Profile management"),
        (name = "Users", description = "Per-user statistics"),
        (name = "RecentlyVisited", description = "Recently viewed products"),
        (name = "Chatbot", description = "Support assistant pass-through"),
        (name = "Contact", description = "Contact form"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
