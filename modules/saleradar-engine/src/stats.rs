//! Per-run stats rollup, persisted as `Run.stats` JSONB.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub stores_processed: u32,
    pub sources_attempted: u32,
    pub sources_failed: u32,
    pub signals_discovered: u32,
    pub messages_extracted: u32,
    pub promos_created: u32,
    pub promos_updated: u32,
    pub changes_recorded: u32,
    pub digest_items: u32,
    pub digest_delivered: bool,
}

impl RunStats {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_json_round_trips_through_serde_json() {
        let stats = RunStats {
            stores_processed: 12,
            sources_attempted: 30,
            sources_failed: 2,
            signals_discovered: 57,
            messages_extracted: 40,
            promos_created: 5,
            promos_updated: 3,
            changes_recorded: 8,
            digest_items: 6,
            digest_delivered: true,
        };

        let value = stats.to_json();
        let round_tripped: RunStats = serde_json::from_value(value).unwrap();
        assert_eq!(round_tripped.stores_processed, 12);
        assert_eq!(round_tripped.promos_created, 5);
        assert!(round_tripped.digest_delivered);
    }

    #[test]
    fn default_stats_serialize_to_zeroed_fields() {
        let value = RunStats::default().to_json();
        assert_eq!(value["stores_processed"], 0);
        assert_eq!(value["digest_delivered"], false);
    }
}
