//! Shared constraint bundles
//!
//! The built-in rules agree on how exposures group: one instrument, one
//! detector, one candidate, one target per association. Each bundle is a
//! builder function returning the constraints for one such concern so the
//! rule variants compose trees instead of repeating node setup.

use crate::constraint::{AttrConstraint, Constraint};

/// Constraints every built-in rule shares: the grouping attributes that
/// must be constant across an association. Each binds on first match.
pub fn grouping_bundle() -> Vec<Constraint> {
    vec![
        AttrConstraint::new(["program"])
            .named("program")
            .force_unique()
            .optional()
            .into(),
        AttrConstraint::new(["instrume"])
            .named("instrument")
            .force_unique()
            .into(),
        AttrConstraint::new(["detector"])
            .named("detector")
            .force_unique()
            .optional()
            .into(),
        AttrConstraint::new(["asn_candidate"])
            .named("asn_candidate")
            .force_unique()
            .optional()
            .into(),
    ]
}

/// Target identity, constant per association
pub fn target_bundle() -> Constraint {
    AttrConstraint::new(["targetid", "targname"])
        .named("target")
        .force_unique()
        .into()
}

/// Optical configuration, constant per association when present
pub fn optical_bundle() -> Vec<Constraint> {
    vec![
        AttrConstraint::new(["filter"])
            .named("filter")
            .force_unique()
            .optional()
            .into(),
        AttrConstraint::new(["pupil", "grating"])
            .named("opt_elem2")
            .force_unique()
            .optional()
            .into(),
    ]
}
