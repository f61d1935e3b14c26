//! Pricing estimation: pure, deterministic arithmetic over dimensions
//! and options.
//!
//! Used for both per-job and per-version estimates; identical inputs
//! always produce an identical [`Estimate`]. Unknown species, finish,
//! or joinery values fall back to the documented default rates rather
//! than failing — the estimator is advisory, not a validator.

use serde::{Deserialize, Serialize};

use crate::model::{BuildOptions, Dimensions};

// ---------------------------------------------------------------------------
// Rate tables
// ---------------------------------------------------------------------------

/// Material cost per board foot by wood species.
const SPECIES_RATES: &[(&str, f64)] = &[
    ("Pine", 4.50),
    ("Oak", 9.00),
    ("Maple", 8.00),
    ("Cherry", 11.00),
    ("Walnut", 14.00),
];

/// Material rate for species not in the table.
const DEFAULT_SPECIES_RATE: f64 = 6.00;

/// Flat finishing charge by finish type.
const FINISH_RATES: &[(&str, f64)] = &[
    ("Natural", 40.00),
    ("Oil", 70.00),
    ("Stain", 90.00),
    ("Paint", 120.00),
];

/// Finishing charge for unknown finishes.
const DEFAULT_FINISH_RATE: f64 = 60.00;

/// Labor multiplier by joinery method.
const JOINERY_FACTORS: &[(&str, f64)] = &[
    ("Screws", 1.0),
    ("Pocket", 1.15),
    ("Dowel", 1.25),
    ("Mortise & Tenon", 1.6),
    ("Dovetail", 1.8),
];

/// Labor multiplier for unknown joinery methods.
const DEFAULT_JOINERY_FACTOR: f64 = 1.1;

/// Shop labor rate, per hour.
const LABOR_RATE_PER_HOUR: f64 = 55.0;

/// Minimum labor hours charged on any piece.
const BASE_LABOR_HOURS: f64 = 3.0;

/// Additional labor hours per board foot of material.
const LABOR_HOURS_PER_BOARD_FOOT: f64 = 0.4;

/// Fraction of the bounding-box volume assumed to be actual lumber.
/// Furniture is mostly shell and air, not solid stock.
const SOLIDITY_FACTOR: f64 = 0.18;

/// Overhead applied on top of materials + labor + finish.
const OVERHEAD_PCT: f64 = 0.15;

/// Quoted range is the total widened by this fraction on each side.
const RANGE_PCT: f64 = 0.10;

// ---------------------------------------------------------------------------
// Estimate types
// ---------------------------------------------------------------------------

/// Customer-facing estimate: total plus a quoted range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PublicEstimate {
    pub total: f64,
    pub range_low: f64,
    pub range_high: f64,
}

/// Full internal breakdown. [`Estimate::public_view`] derives the
/// customer-facing subset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub materials: f64,
    pub labor: f64,
    pub finish: f64,
    pub overhead: f64,
    pub total: f64,
    pub range_low: f64,
    pub range_high: f64,
}

impl Estimate {
    pub fn public_view(&self) -> PublicEstimate {
        PublicEstimate {
            total: self.total,
            range_low: self.range_low,
            range_high: self.range_high,
        }
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Rough lumber take-off in board feet: bounding-box volume scaled by
/// [`SOLIDITY_FACTOR`]. One board foot is 144 cubic inches.
fn board_feet(dims: &Dimensions) -> f64 {
    let volume_in3 = dims.length_in.max(0.0) * dims.width_in.max(0.0) * dims.height_in.max(0.0);
    volume_in3 / 144.0 * SOLIDITY_FACTOR
}

fn rate_for(table: &[(&str, f64)], key: &str, default: f64) -> f64 {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, rate)| *rate)
        .unwrap_or(default)
}

/// Round to whole cents so repeated serialization stays stable.
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute a pricing estimate from dimensions and options.
///
/// Synchronous, pure, and deterministic given identical inputs.
pub fn estimate(dims: &Dimensions, options: &BuildOptions) -> Estimate {
    let bdft = board_feet(dims);

    let materials = bdft * rate_for(SPECIES_RATES, &options.wood_species, DEFAULT_SPECIES_RATE);
    let joinery_factor = rate_for(JOINERY_FACTORS, &options.joinery, DEFAULT_JOINERY_FACTOR);
    let labor_hours = BASE_LABOR_HOURS + bdft * LABOR_HOURS_PER_BOARD_FOOT;
    let labor = labor_hours * LABOR_RATE_PER_HOUR * joinery_factor;
    let finish = rate_for(FINISH_RATES, &options.finish, DEFAULT_FINISH_RATE);
    let overhead = (materials + labor + finish) * OVERHEAD_PCT;
    let total = materials + labor + finish + overhead;

    Estimate {
        materials: round_cents(materials),
        labor: round_cents(labor),
        finish: round_cents(finish),
        overhead: round_cents(overhead),
        total: round_cents(total),
        range_low: round_cents(total * (1.0 - RANGE_PCT)),
        range_high: round_cents(total * (1.0 + RANGE_PCT)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table_dims() -> Dimensions {
        Dimensions {
            length_in: 60.0,
            width_in: 30.0,
            height_in: 30.0,
        }
    }

    fn pine_screws() -> BuildOptions {
        BuildOptions {
            wood_species: "Pine".into(),
            finish: "Natural".into(),
            joinery: "Screws".into(),
        }
    }

    #[test]
    fn estimate_is_deterministic() {
        let a = estimate(&table_dims(), &pine_screws());
        let b = estimate(&table_dims(), &pine_screws());
        assert_eq!(a, b);
    }

    #[test]
    fn total_is_sum_of_parts() {
        let e = estimate(&table_dims(), &pine_screws());
        let sum = e.materials + e.labor + e.finish + e.overhead;
        assert!((e.total - sum).abs() < 0.02); // per-part cent rounding
    }

    #[test]
    fn range_brackets_total() {
        let e = estimate(&table_dims(), &pine_screws());
        assert!(e.range_low < e.total);
        assert!(e.range_high > e.total);
    }

    #[test]
    fn bigger_piece_costs_more() {
        let small = estimate(&table_dims(), &pine_screws());
        let big = estimate(
            &Dimensions {
                length_in: 96.0,
                width_in: 40.0,
                height_in: 30.0,
            },
            &pine_screws(),
        );
        assert!(big.total > small.total);
    }

    #[test]
    fn walnut_costs_more_than_pine() {
        let mut walnut = pine_screws();
        walnut.wood_species = "Walnut".into();
        let pine = estimate(&table_dims(), &pine_screws());
        let premium = estimate(&table_dims(), &walnut);
        assert!(premium.materials > pine.materials);
        assert!(premium.total > pine.total);
    }

    #[test]
    fn dovetail_raises_labor_only() {
        let mut dovetail = pine_screws();
        dovetail.joinery = "Dovetail".into();
        let screws = estimate(&table_dims(), &pine_screws());
        let joined = estimate(&table_dims(), &dovetail);
        assert!(joined.labor > screws.labor);
        assert_eq!(joined.materials, screws.materials);
        assert_eq!(joined.finish, screws.finish);
    }

    #[test]
    fn unknown_options_fall_back_to_defaults() {
        let odd = BuildOptions {
            wood_species: "Zebrawood".into(),
            finish: "Glitter".into(),
            joinery: "Duct tape".into(),
        };
        let e = estimate(&table_dims(), &odd);
        assert!(e.total > 0.0);
    }

    #[test]
    fn species_lookup_is_case_insensitive() {
        let mut lower = pine_screws();
        lower.wood_species = "pine".into();
        assert_eq!(
            estimate(&table_dims(), &lower),
            estimate(&table_dims(), &pine_screws())
        );
    }

    #[test]
    fn zero_dimensions_still_charge_base_labor() {
        let e = estimate(
            &Dimensions {
                length_in: 0.0,
                width_in: 0.0,
                height_in: 0.0,
            },
            &pine_screws(),
        );
        // No material, but base labor + finish + overhead remain.
        assert_eq!(e.materials, 0.0);
        assert!(e.labor > 0.0);
        assert!(e.total > 0.0);
    }

    #[test]
    fn negative_dimensions_clamped() {
        let e = estimate(
            &Dimensions {
                length_in: -10.0,
                width_in: 30.0,
                height_in: 30.0,
            },
            &pine_screws(),
        );
        assert_eq!(e.materials, 0.0);
    }

    #[test]
    fn public_view_matches_totals() {
        let e = estimate(&table_dims(), &pine_screws());
        let p = e.public_view();
        assert_eq!(p.total, e.total);
        assert_eq!(p.range_low, e.range_low);
        assert_eq!(p.range_high, e.range_high);
    }

    #[test]
    fn values_are_cent_rounded() {
        let e = estimate(&table_dims(), &pine_screws());
        for v in [e.materials, e.labor, e.finish, e.overhead, e.total] {
            assert!((v * 100.0 - (v * 100.0).round()).abs() < 1e-9);
        }
    }
}
