pub mod cache_gc;
pub mod order_poller;

pub use cache_gc::start_cache_gc;
pub use order_poller::{DisplaySubscription, OrderPoller};
