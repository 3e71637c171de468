pub mod digest;
pub mod digest_selector;
pub mod mailbox;
pub mod promo_merger;
pub mod signal_persister;
pub mod store_catalog;

pub use digest::{fan_out, render, ChatChannel, DesktopChannel, EmailChannel, NotificationChannel, RenderedDigest};
pub use digest_selector::{DigestBadge, DigestItem, DigestSelector};
pub use mailbox::{FileMailboxReader, MailboxIngestor, MailboxReader, RawMailMessage};
pub use promo_merger::{MergeOutcome, PromoMerger};
pub use signal_persister::SignalPersister;
pub use store_catalog::StoreCatalog;
