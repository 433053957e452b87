pub mod order;
pub mod session;
pub mod store;

pub use order::*;
pub use session::*;
pub use store::*;
