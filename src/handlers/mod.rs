pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod orders;
pub mod shipping;
pub mod webhooks;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "lojinha", description = "Storefront and back-office API"),
    paths(
        webhooks::stripe_webhook,
        webhooks::mercadopago_webhook,
        checkout::create_checkout,
        shipping::quote_shipping,
        orders::list_orders,
        orders::get_order,
        orders::update_order,
        orders::my_orders,
        orders::check_order,
        catalog::list_products,
        catalog::get_product,
        catalog::list_categories,
        catalog::list_banners,
        catalog::add_review,
        catalog::admin_list_products,
        catalog::admin_get_product,
        catalog::create_product,
        catalog::update_product,
        catalog::delete_product,
        catalog::create_category,
        catalog::update_category,
        catalog::delete_category,
        catalog::admin_list_banners,
        catalog::create_banner,
        catalog::update_banner,
        catalog::delete_banner,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        contact::subscribe,
        contact::export_subscribers,
        contact::send_message,
        contact::list_messages,
    ),
    components(schemas(
        webhooks::WebhookResponse,
        checkout::CheckoutRequest,
        checkout::CheckoutItemRequest,
        checkout::AddressRequest,
        checkout::CheckoutResponse,
        shipping::ShippingQuoteRequest,
        shipping::PackageItemRequest,
        shipping::ShippingQuoteResponse,
        shipping::QuoteResponse,
        orders::OrderResponse,
        orders::OrderCheckResponse,
        orders::OrderItemResponse,
        orders::ListOrdersResponse,
        orders::UpdateOrderRequest,
        catalog::ProductResponse,
        catalog::VariationResponse,
        catalog::ReviewResponse,
        catalog::CategoryResponse,
        catalog::BannerResponse,
        catalog::ProductRequest,
        catalog::VariationRequest,
        catalog::CategoryRequest,
        catalog::BannerRequest,
        catalog::ReviewRequest,
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::LoginResponse,
        auth::UserResponse,
        contact::SubscribeRequest,
        contact::SubscribeResponse,
        contact::ContactRequest,
        contact::MessageResponse,
    ))
)]
pub struct ApiDoc;
