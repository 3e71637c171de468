pub mod message_repo;
pub mod pg_enum;
pub mod pool;
pub mod promo_repo;
pub mod run_repo;
pub mod signal_repo;
pub mod store_repo;
#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

pub use message_repo::MessageRepo;
pub use pool::{connect, run_migrations};
pub use promo_repo::{PromoFields, PromoRepo};
pub use run_repo::{RunLockGuard, RunRepo};
pub use signal_repo::SignalRepo;
pub use store_repo::StoreRepo;
