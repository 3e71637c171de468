pub mod client;
pub mod filter;
pub mod prompt;
pub mod schemas;

pub use client::{ClaudeExtractor, Extractor, FixtureExtractor};
pub use filter::{filter_flight_promos, filter_non_discount_promos, FlightPreferences};
pub use prompt::{format_email_for_extraction, SYSTEM_PROMPT};
pub use schemas::{ExtractedPromo, ExtractionResult, FlightDetails};
