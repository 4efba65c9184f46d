//! Spec-name canonicalization.
//!
//! Maps a user-facing spec name ("Mileage") to its canonical name plus the
//! alternate aliases of the same spec. Drives structured lookup preflight
//! and labels batch-response entries with every name that was considered.
//! Built atop the same static-table approach as the category aliaser.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonical spec name → alternate spellings seen in brochures and queries.
static SPEC_NAME_GROUPS: &[(&str, &[&str])] = &[
    ("Fuel Efficiency", &["Mileage", "Fuel Economy", "Fuel Consumption", "Economy", "kmpl"]),
    ("Power", &["Max Power", "Maximum Power", "Horsepower", "Engine Power", "BHP"]),
    ("Torque", &["Max Torque", "Peak Torque", "Maximum Torque"]),
    ("Displacement", &["Engine Displacement", "Engine Capacity", "Cubic Capacity"]),
    ("Ground Clearance", &["Ride Height", "Clearance"]),
    ("Seating Capacity", &["Seats", "Seating"]),
    ("Fuel Tank Capacity", &["Tank Capacity", "Fuel Capacity"]),
    ("Boot Space", &["Trunk Space", "Luggage Capacity", "Cargo Space"]),
    ("Kerb Weight", &["Curb Weight", "Unladen Weight"]),
    ("Gross Weight", &["GVW", "Gross Vehicle Weight"]),
    ("Top Speed", &["Maximum Speed", "Max Speed"]),
    ("Color", &["Colors", "Colour", "Colours", "Paint Options"]),
    ("Battery Range", &["Range", "Driving Range", "Electric Range"]),
    ("Battery Capacity", &["Battery Size"]),
    ("Transmission", &["Gearbox", "Transmission Type"]),
    ("Airbags", &["Air Bags", "Airbag Count"]),
    ("Wheelbase", &[]),
    ("Turning Radius", &["Turning Circle"]),
];

/// Lowercased alias (canonical spellings included) → group index.
static SPEC_NAME_LOOKUP: LazyLock<HashMap<String, usize>> = LazyLock::new(|| {
    let mut lookup = HashMap::new();
    for (idx, (canonical, aliases)) in SPEC_NAME_GROUPS.iter().enumerate() {
        lookup.insert(canonical.to_lowercase(), idx);
        for alias in *aliases {
            lookup.insert(alias.to_lowercase(), idx);
        }
    }
    lookup
});

/// Normalize a free-form spec name.
///
/// Returns the canonical name plus every alternate alias of the same spec
/// (the matched spelling excluded). Unknown names pass through trimmed
/// with no alternates.
#[must_use]
pub fn normalize_spec_name(name: &str) -> (String, Vec<String>) {
    let trimmed = name.trim();
    let key = trimmed.to_lowercase();
    let Some(&idx) = SPEC_NAME_LOOKUP.get(key.as_str()) else {
        return (trimmed.to_string(), Vec::new());
    };
    let (canonical, aliases) = SPEC_NAME_GROUPS[idx];
    let alternatives = std::iter::once(canonical)
        .chain(aliases.iter().copied())
        .filter(|candidate| !candidate.eq_ignore_ascii_case(trimmed))
        .map(ToString::to_string)
        .collect();
    (canonical.to_string(), alternatives)
}
