//! Category canonicalization.
//!
//! Brochure-specific category names collapse onto a standard hierarchy via
//! a case-insensitive, trimmed lookup against a static alias map; on miss
//! the trimmed input passes through unchanged. Pure, thread-safe, O(1).

use std::collections::HashMap;
use std::sync::LazyLock;

/// Standard category hierarchy aliases, covering plural/singular forms
/// and the long tail of automotive brochure synonyms.
static CATEGORY_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // Fuel efficiency
        ("mileage", "Fuel Efficiency"),
        ("fuel economy", "Fuel Efficiency"),
        ("fuel consumption", "Fuel Efficiency"),
        ("efficiency", "Fuel Efficiency"),
        ("economy", "Fuel Efficiency"),
        // Engine
        ("engine", "Engine"),
        ("engine & transmission", "Engine"),
        ("engine and transmission", "Engine"),
        ("powertrain", "Engine"),
        ("motor", "Engine"),
        ("performance", "Engine"),
        // Transmission
        ("transmission", "Transmission"),
        ("gearbox", "Transmission"),
        ("drivetrain", "Transmission"),
        // Dimensions
        ("dimensions", "Dimensions"),
        ("dimension", "Dimensions"),
        ("dimensions & weight", "Dimensions"),
        ("dimensions and capacity", "Dimensions"),
        ("measurements", "Dimensions"),
        // Exterior
        ("exterior", "Exterior"),
        ("exteriors", "Exterior"),
        ("headlamps", "Exterior"),
        ("headlights", "Exterior"),
        ("body", "Exterior"),
        ("colours", "Exterior"),
        ("colors", "Exterior"),
        ("styling", "Exterior"),
        // Interior
        ("interior", "Interior"),
        ("interiors", "Interior"),
        ("cabin", "Interior"),
        ("upholstery", "Interior"),
        ("seating", "Interior"),
        // Safety
        ("safety", "Safety"),
        ("safety features", "Safety"),
        ("security", "Safety"),
        ("airbags", "Safety"),
        ("braking", "Safety"),
        ("brakes", "Safety"),
        // Comfort & convenience
        ("comfort", "Comfort & Convenience"),
        ("convenience", "Comfort & Convenience"),
        ("comfort & convenience", "Comfort & Convenience"),
        ("comfort and convenience", "Comfort & Convenience"),
        ("climate control", "Comfort & Convenience"),
        // Infotainment
        ("infotainment", "Infotainment"),
        ("entertainment", "Infotainment"),
        ("audio", "Infotainment"),
        ("connectivity", "Infotainment"),
        ("technology", "Infotainment"),
        // Suspension & chassis
        ("suspension", "Suspension & Chassis"),
        ("chassis", "Suspension & Chassis"),
        ("suspension & chassis", "Suspension & Chassis"),
        ("steering", "Suspension & Chassis"),
        // Wheels
        ("wheels", "Wheels & Tyres"),
        ("tyres", "Wheels & Tyres"),
        ("tires", "Wheels & Tyres"),
        ("wheels & tyres", "Wheels & Tyres"),
        ("wheels and tires", "Wheels & Tyres"),
        // Capacity
        ("capacity", "Capacity"),
        ("fuel tank", "Capacity"),
        ("boot space", "Capacity"),
        ("cargo", "Capacity"),
        // Battery / EV
        ("battery", "Battery & Charging"),
        ("charging", "Battery & Charging"),
        ("battery & charging", "Battery & Charging"),
        ("range", "Battery & Charging"),
        // Warranty / pricing
        ("warranty", "Warranty"),
        ("price", "Pricing"),
        ("pricing", "Pricing"),
    ])
});

/// Canonicalize a brochure category. Unknown categories pass through
/// trimmed but otherwise unchanged.
#[must_use]
pub fn normalize_category(category: &str) -> String {
    let key = category.trim().to_lowercase();
    CATEGORY_ALIASES
        .get(key.as_str())
        .map_or_else(|| category.trim().to_string(), |canonical| (*canonical).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_collapse_to_hierarchy() {
        assert_eq!(normalize_category("mileage"), "Fuel Efficiency");
        assert_eq!(normalize_category("Headlamps"), "Exterior");
        assert_eq!(normalize_category("  GEARBOX "), "Transmission");
    }

    #[test]
    fn unknown_categories_pass_through() {
        assert_eq!(normalize_category("Aerodynamics"), "Aerodynamics");
        assert_eq!(normalize_category("  Aerodynamics  "), "Aerodynamics");
    }

    #[test]
    fn canonical_names_are_stable() {
        for canonical in ["Fuel Efficiency", "Engine", "Exterior", "Safety"] {
            assert_eq!(normalize_category(canonical), canonical);
        }
    }
}
