//! Post-extraction filters applied before an `ExtractionResult` is
//! persisted: drop promos with no real discount signal, and drop flight
//! promos that don't match the user's travel preferences.

use saleradar_common::normalize::{has_discount_signal, normalize_region};

use crate::schemas::{ExtractedPromo, ExtractionResult};

#[derive(Clone, Debug, Default)]
pub struct FlightPreferences {
    pub preferred_origins: Vec<String>,
    pub preferred_regions: Vec<String>,
    pub max_price_by_region: std::collections::HashMap<String, f64>,
}

/// Drops promos that carry no discount signal at all. If doing so leaves
/// zero promos, `is_promo_email` flips to `false` — a message that only
/// looked like a promo email because of one non-discount item is not one.
pub fn filter_non_discount_promos(result: &mut ExtractionResult) {
    result.promos.retain(|p| {
        has_discount_signal(
            &p.headline,
            p.code.as_deref(),
            p.percent_off,
            p.amount_off,
            p.discount_text.as_deref(),
        )
    });
    if result.promos.is_empty() {
        result.is_promo_email = false;
    }
}

/// Drops flight promos whose origin, region, or price falls outside the
/// configured preferences. Non-flight promos and flights with no
/// preferences configured for a dimension always pass.
pub fn filter_flight_promos(result: &mut ExtractionResult, prefs: &FlightPreferences) {
    result.promos.retain(|p| flight_promo_allowed(p, prefs));
}

fn flight_promo_allowed(promo: &ExtractedPromo, prefs: &FlightPreferences) -> bool {
    if promo.vertical != "flight" {
        return true;
    }
    let Some(flight) = &promo.flight else {
        return true;
    };

    if flight.price_usd.is_none() {
        return false;
    }

    if !prefs.preferred_origins.is_empty() {
        let preferred: std::collections::HashSet<String> = prefs
            .preferred_origins
            .iter()
            .map(|o| o.to_lowercase())
            .collect();
        let flight_origins: std::collections::HashSet<String> =
            flight.origins.iter().map(|o| o.to_lowercase()).collect();
        if flight_origins.is_disjoint(&preferred) {
            return false;
        }
    }

    if !prefs.preferred_regions.is_empty() {
        let normalized_preferred: Vec<String> = prefs
            .preferred_regions
            .iter()
            .filter_map(|r| normalize_region(r))
            .collect();
        let flight_region = flight.region.as_deref().and_then(normalize_region);
        match flight_region {
            Some(region) if normalized_preferred.contains(&region) => {}
            _ => return false,
        }
    }

    if let (Some(region), Some(price)) = (flight.region.as_deref().and_then(normalize_region), flight.price_usd) {
        if let Some(max) = prefs.max_price_by_region.get(&region) {
            if price > *max {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::FlightDetails;

    fn promo(headline: &str) -> ExtractedPromo {
        ExtractedPromo {
            headline: headline.to_string(),
            code: None,
            landing_url: None,
            percent_off: None,
            amount_off: None,
            discount_text: None,
            vertical: "retail".to_string(),
            starts_at: None,
            ends_at: None,
            flight: None,
            confidence: 0.9,
        }
    }

    #[test]
    fn filters_non_discount_promos() {
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![promo("New arrivals")],
        };
        filter_non_discount_promos(&mut result);
        assert!(result.promos.is_empty());
        assert!(!result.is_promo_email);
    }

    #[test]
    fn keeps_sale_keyword() {
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![promo("Winter Sale")],
        };
        filter_non_discount_promos(&mut result);
        assert_eq!(result.promos.len(), 1);
    }

    #[test]
    fn keeps_code_only() {
        let mut p = promo("New arrivals");
        p.code = Some("SAVE20".to_string());
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![p],
        };
        filter_non_discount_promos(&mut result);
        assert_eq!(result.promos.len(), 1);
    }

    #[test]
    fn filters_free_shipping_only() {
        let mut p = promo("Check out our new styles");
        p.discount_text = Some("Free shipping".to_string());
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![p],
        };
        filter_non_discount_promos(&mut result);
        assert!(result.promos.is_empty());
    }

    fn flight_promo(region: &str, price: Option<f64>) -> ExtractedPromo {
        let mut p = promo("Flight Sale");
        p.vertical = "flight".to_string();
        p.flight = Some(FlightDetails {
            origins: vec!["JFK".to_string()],
            region: Some(region.to_string()),
            price_usd: price,
        });
        p
    }

    #[test]
    fn flight_requires_price() {
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![flight_promo("Europe", None)],
        };
        filter_flight_promos(&mut result, &FlightPreferences::default());
        assert!(result.promos.is_empty());
    }

    #[test]
    fn flight_with_price_kept_when_no_preferences() {
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![flight_promo("Europe", Some(299.0))],
        };
        filter_flight_promos(&mut result, &FlightPreferences::default());
        assert_eq!(result.promos.len(), 1);
    }

    #[test]
    fn filter_allows_normalized_region() {
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![flight_promo("Western Europe", Some(299.0))],
        };
        let prefs = FlightPreferences {
            preferred_regions: vec!["europe".to_string()],
            ..Default::default()
        };
        filter_flight_promos(&mut result, &prefs);
        assert_eq!(result.promos.len(), 1);
    }

    #[test]
    fn filter_blocks_mismatched_region() {
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![flight_promo("Asia", Some(299.0))],
        };
        let prefs = FlightPreferences {
            preferred_regions: vec!["europe".to_string()],
            ..Default::default()
        };
        filter_flight_promos(&mut result, &prefs);
        assert!(result.promos.is_empty());
    }

    #[test]
    fn filter_blocks_price_over_region_max() {
        let mut result = ExtractionResult {
            is_promo_email: true,
            promos: vec![flight_promo("Europe", Some(900.0))],
        };
        let mut max_price_by_region = std::collections::HashMap::new();
        max_price_by_region.insert("europe".to_string(), 500.0);
        let prefs = FlightPreferences {
            max_price_by_region,
            ..Default::default()
        };
        filter_flight_promos(&mut result, &prefs);
        assert!(result.promos.is_empty());
    }
}
