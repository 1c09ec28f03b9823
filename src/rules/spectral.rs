//! Spectroscopic associations

use crate::constraint::{AttrConstraint, Constraint, ConstraintGroup};

use super::builders::{grouping_bundle, optical_bundle, target_bundle};
use super::RuleVariant;

/// Non-imaging, non-dispersed-pair spectroscopy
pub struct SpectralRule;

const SPEC_EXP_TYPES: &str =
    "nrs_fixedslit|nrs_ifu|nrs_msaspec|mir_lrs-fixedslit|mir_lrs-slitless|mir_mrs|nis_soss";

/// Nodded fixed-slit exposures are grouped by the slit-nod rule instead
const NOD_PATTERNS: &str = "2-point-nod|4-point-nod";

impl RuleVariant for SpectralRule {
    fn name(&self) -> &'static str {
        "spectral"
    }

    fn asn_type(&self) -> &'static str {
        "spec2"
    }

    fn build_tree(&self) -> Constraint {
        let mut children = grouping_bundle();
        children.push(target_bundle());
        children.extend(optical_bundle());
        children.push(
            AttrConstraint::new(["exp_type"])
                .named("exp_type")
                .pattern(SPEC_EXP_TYPES)
                .into(),
        );
        children.push(
            ConstraintGroup::notany(vec![AttrConstraint::new(["tsovisit"])
                .pattern("t|true|y")
                .into()])
            .into(),
        );
        // Fixed-slit nods have their own rule; exclude only the
        // combination, so un-nodded fixed slits and nodded non-slit
        // exposures still land here.
        children.push(
            ConstraintGroup::notall(vec![
                AttrConstraint::new(["exp_type"]).pattern("nrs_fixedslit").into(),
                AttrConstraint::new(["patttype"]).pattern(NOD_PATTERNS).into(),
            ])
            .into(),
        );
        ConstraintGroup::all(children).into()
    }
}
