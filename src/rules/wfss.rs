//! Wide-field slitless spectroscopy associations
//!
//! Grism exposures carry the science; their matching direct images are
//! needed for source extraction but must never start an association of
//! their own. A direct image offered before any grism exists raises a
//! non-science reprocess request so it is picked up once the grism
//! association has formed.

use crate::constraint::{AttrConstraint, Constraint, ConstraintGroup, GuardConstraint, ReprocessOn};
use crate::engine::process::Category;
use crate::item::Item;

use super::builders::{grouping_bundle, target_bundle};
use super::{default_item_role, RuleVariant};

/// Dispersed exposures plus their direct images
pub struct WfssRule;

const GRISM_EXP_TYPES: &[&str] = &["nis_wfss", "nrc_wfss", "nrc_grism"];
const DIRECT_EXP_TYPES: &str = "nis_image|nrc_image";

fn is_grism(item: &Item) -> bool {
    item.get_str("exp_type")
        .is_some_and(|v| GRISM_EXP_TYPES.contains(&v.to_ascii_lowercase().as_str()))
}

impl RuleVariant for WfssRule {
    fn name(&self) -> &'static str {
        "wfss"
    }

    fn asn_type(&self) -> &'static str {
        "spec2"
    }

    fn build_tree(&self) -> Constraint {
        let mut children = grouping_bundle();
        children.push(target_bundle());
        children.push(
            ConstraintGroup::any(vec![
                AttrConstraint::new(["exp_type"])
                    .named("grism")
                    .pattern(GRISM_EXP_TYPES.join("|"))
                    .into(),
                AttrConstraint::new(["exp_type"])
                    .named("direct_image")
                    .pattern(DIRECT_EXP_TYPES)
                    .reprocess(Category::NonScience, ReprocessOn::Match)
                    .into(),
            ])
            .into(),
        );
        // Only a grism exposure may start the association; direct images
        // join after the science is in place.
        children.push(
            GuardConstraint::new(|item, ctx| is_grism(item) || ctx.has_science())
                .named("has_science_anchor")
                .into(),
        );
        ConstraintGroup::all(children).into()
    }

    fn item_role(&self, item: &Item) -> String {
        if is_grism(item) {
            default_item_role(item)
        } else {
            "direct_image".to_string()
        }
    }
}
