//! Imaging associations

use crate::constraint::{AttrConstraint, Constraint, ConstraintGroup};

use super::builders::{grouping_bundle, target_bundle};
use super::RuleVariant;

/// Direct-imaging exposures, one association per exposure group
pub struct ImageRule;

/// Exposure types this rule accepts
const IMAGE_EXP_TYPES: &str = "nrc_image|nis_image|mir_image|fgs_image";

impl RuleVariant for ImageRule {
    fn name(&self) -> &'static str {
        "image"
    }

    fn asn_type(&self) -> &'static str {
        "image2"
    }

    fn build_tree(&self) -> Constraint {
        let mut children = grouping_bundle();
        children.push(target_bundle());
        children.push(
            AttrConstraint::new(["exp_type"])
                .named("exp_type")
                .pattern(IMAGE_EXP_TYPES)
                .into(),
        );
        // Time-series visits are processed by dedicated machinery, never
        // grouped here.
        children.push(
            ConstraintGroup::notany(vec![AttrConstraint::new(["tsovisit"])
                .pattern("t|true|y")
                .into()])
            .into(),
        );
        ConstraintGroup::all(children).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::EvalFacts;
    use crate::item::Item;

    fn facts() -> EvalFacts {
        EvalFacts {
            role: "science".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_imaging_rejects_spectral() {
        let mut tree = ImageRule.build_tree();
        let image = Item::builder()
            .attr("instrume", "nircam")
            .attr("exp_type", "nrc_image")
            .attr("targetid", "1")
            .build();
        assert!(tree.evaluate(&image, &facts()).matched);

        let mut tree = ImageRule.build_tree();
        let spec = Item::builder()
            .attr("instrume", "nirspec")
            .attr("exp_type", "nrs_fixedslit")
            .attr("targetid", "1")
            .build();
        assert!(!tree.evaluate(&spec, &facts()).matched);
    }

    #[test]
    fn test_rejects_time_series_visits() {
        let mut tree = ImageRule.build_tree();
        let tso = Item::builder()
            .attr("instrume", "nircam")
            .attr("exp_type", "nrc_image")
            .attr("targetid", "1")
            .attr("tsovisit", "t")
            .build();
        assert!(!tree.evaluate(&tso, &facts()).matched);
    }
}
