pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod normalize;

pub use config::Config;
pub use error::SaleradarError;

/// Initializes the global tracing subscriber from `RUST_LOG`/`SALERADAR_LOG`.
/// Called once by each binary entrypoint.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("SALERADAR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
