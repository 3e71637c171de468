//! Tunables referenced across crates. Centralized here so adapters, the
//! merger and the digest selector agree on the same windows without
//! importing each other.

/// Matching window for `PromoMerger` when looking for an existing promo to
/// update rather than create.
pub const PROMO_MATCH_WINDOW_DAYS: i64 = 30;

/// A promo whose `ends_at` is in the past by less than this is still
/// eligible for matching (grace period for "ending today" offers).
pub const PROMO_MATCH_GRACE_DAYS: i64 = 2;

/// Default lookback when no prior successful digest run exists.
pub const DEFAULT_DIGEST_LOOKBACK_HOURS: i64 = 24;

/// Cooldown before an ACTIVE (unchanged) promo reappears in a digest.
pub const DIGEST_ACTIVE_COOLDOWN_DAYS: i64 = 7;

/// Cap on items read from a single RSS/Atom feed per run.
pub const RSS_MAX_ITEMS: usize = 20;

/// Feed items older than this are dropped before persisting.
pub const RSS_MAX_AGE_DAYS: i64 = 30;

/// Chars of message body sent to the extractor before truncation.
pub const EXTRACTION_BODY_TRUNCATE_CHARS: usize = 3000;

/// Max links from a message attached to the extraction prompt.
pub const EXTRACTION_MAX_TOP_LINKS: usize = 5;
