use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Display API",
        version = "1.0.0",
        description = "Order status board for restaurant counters.\n\n**Authentication:** admin endpoints take the Supabase access token as a Bearer token (or the `sb-access-token` cookie). The display endpoints are public.",
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::get_me,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Stores
        crate::api::stores::list_stores,
        crate::api::stores::create_store,
        crate::api::stores::get_store,
        crate::api::stores::rename_store,
        crate::api::stores::delete_store,

        // Orders
        crate::api::stores::list_store_orders,
        crate::api::orders::create_order,
        crate::api::orders::update_order_status,

        // Display
        crate::api::display::get_board,
    ),
    components(
        schemas(
            crate::models::LoginRequest,
            crate::models::LoginResponse,
            crate::models::User,
            crate::api::health::HealthResponse,
            crate::models::StoreId,
            crate::models::Store,
            crate::models::StoreRequest,
            crate::models::StoresResponse,
            crate::models::StoreResponse,
            crate::models::Order,
            crate::models::OrderStatus,
            crate::models::CreateOrderRequest,
            crate::models::UpdateOrderStatusRequest,
            crate::models::OrdersResponse,
            crate::models::OrderResponse,
            crate::display::DisplayBoard,
        )
    ),
    tags(
        (name = "Auth", description = "Sign in and out against Supabase Auth."),
        (name = "Health", description = "Health check and Prometheus metrics."),
        (name = "Stores", description = "Store management for admins."),
        (name = "Orders", description = "Order creation and status changes."),
        (name = "Display", description = "Public board of a store, as shown on the counter screen."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Supabase access token"))
                        .build(),
                ),
            );
        }
    }
}
