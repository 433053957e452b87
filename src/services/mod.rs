pub mod auth_service;
pub mod order_service;
pub mod store_service;

pub use auth_service::{AuthProvider, JwtVerifier};
pub use order_service::OrderRepository;
pub use store_service::StoreRepository;
