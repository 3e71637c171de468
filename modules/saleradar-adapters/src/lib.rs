pub mod browser;
pub mod category;
pub mod json_adapter;
pub mod router;
pub mod rss;
pub mod sitemap;
pub mod types;

pub use browser::{BrowserAdapter, BrowserlessRenderer, PageRenderer};
pub use category::CategoryAdapter;
pub use json_adapter::JsonAdapter;
pub use router::TieredRouter;
pub use rss::RssAdapter;
pub use sitemap::SitemapAdapter;
pub use types::{signal_key, Adapter, SignalDraft, SourceResult};
