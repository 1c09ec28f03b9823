//! Nodded fixed-slit associations
//!
//! Fixed-slit exposures taken in a nod pattern calibrate each other: the
//! exposure at the anchored nod position is the science member, exposures
//! at the other positions join as background. A second exposure at the
//! anchored position is forced out via the `force_match` override so the
//! association holds exactly one science exposure per product.

use crate::constraint::{AttrConstraint, Constraint, ConstraintGroup, GuardConstraint};
use crate::item::Item;

use super::builders::{grouping_bundle, optical_bundle, target_bundle};
use super::RuleVariant;

/// Fixed-slit nod pairs: science at the bound nod position, backgrounds
/// at the others
pub struct SlitNodRule;

const NOD_PATTERNS: &str = "2-point-nod|4-point-nod";

impl RuleVariant for SlitNodRule {
    fn name(&self) -> &'static str {
        "slit-nod"
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
                .pattern("nrs_fixedslit")
                .into(),
        );
        children.push(
            AttrConstraint::new(["patttype"])
                .named("patttype")
                .pattern(NOD_PATTERNS)
                .into(),
        );
        // The first exposure anchors the nod position; exposures at other
        // positions join as background.
        children.push(
            ConstraintGroup::any(vec![
                AttrConstraint::new(["patt_num"])
                    .named("patt_num")
                    .force_unique()
                    .into(),
                GuardConstraint::new(|item, ctx| {
                    match (item.get_str("patt_num"), ctx.binding("patt_num")) {
                        (Some(theirs), Some(anchored)) => theirs != anchored,
                        _ => false,
                    }
                })
                .named("is_nod_background")
                .into(),
            ])
            .into(),
        );
        // A second exposure at the anchored position must not merge as a
        // duplicate science member. The guard is vacuous: it only carries
        // the veto, it never votes in the reduce.
        children.push(
            GuardConstraint::new(|item, ctx| {
                ctx.has_science()
                    && matches!(
                        (item.get_str("patt_num"), ctx.binding("patt_num")),
                        (Some(theirs), Some(anchored)) if theirs == anchored
                    )
            })
            .named("force_match")
            .bind_on_match(false)
            .vacuous()
            .into(),
        );
        ConstraintGroup::all(children).into()
    }

    fn member_role(&self, tree: &Constraint, item: &Item) -> String {
        if tree.node_matched("is_nod_background") {
            "background".to_string()
        } else {
            self.item_role(item)
        }
    }
}
