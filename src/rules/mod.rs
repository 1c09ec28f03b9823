//! Rule variants
//!
//! A rule variant is everything that distinguishes one association flavor
//! from another: its name and type, the constraint tree it matches items
//! with, the schema its documents validate against, and how accepted
//! items become members. The engine and [`Association`] only ever see the
//! [`RuleVariant`] trait.
//!
//! [`Association`]: crate::association::Association

mod builders;
mod image;
mod slit_nod;
mod spectral;
mod wfss;

pub use image::ImageRule;
pub use slit_nod::SlitNodRule;
pub use spectral::SpectralRule;
pub use wfss::WfssRule;

use std::sync::OnceLock;

use serde_json::Value;

use crate::association::{AsnDocument, Member};
use crate::constraint::Constraint;
use crate::error::Result;
use crate::item::Item;
use crate::registry::RuleRegistry;

/// Capabilities of one association flavor
pub trait RuleVariant: Send + Sync {
    /// Registry name of the rule
    fn name(&self) -> &'static str;

    /// Association type recorded in produced documents
    fn asn_type(&self) -> &'static str;

    /// A fresh constraint tree for a new association
    fn build_tree(&self) -> Constraint;

    /// Schema the rule's documents must satisfy
    fn schema(&self) -> &Value {
        default_schema()
    }

    /// One-time setup when the first item is accepted
    fn init_hook(&self, _doc: &mut AsnDocument, _item: &Item) {}

    /// Role the item would play, judged from the item alone
    fn item_role(&self, item: &Item) -> String {
        default_item_role(item)
    }

    /// Role actually recorded for an accepted member; sees the evaluated
    /// constraint tree so the role can depend on which branch matched
    fn member_role(&self, _tree: &Constraint, item: &Item) -> String {
        self.item_role(item)
    }

    /// Member record for an accepted item
    fn make_member(&self, item: &Item, exptype: &str) -> Member {
        let mut member = Member::new(item.expname(), exptype);
        if let Some(exposerr) = item.get_str("exposerr") {
            member
                .extra
                .insert("exposerr".to_string(), Value::String(exposerr));
        }
        member
    }

    /// Product name for the association, derived from its first item
    fn product_name(&self, item: &Item) -> String {
        default_product_name(item)
    }
}

/// The built-in document schema, parsed once
pub fn default_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        serde_json::from_str(include_str!("../association/asn_schema.json"))
            .unwrap_or(Value::Null)
    })
}

/// Role resolution shared by the built-in rules: special-purpose markers
/// win over the science default
pub fn default_item_role(item: &Item) -> String {
    let flagged = |attr: &str| {
        item.get_str(attr)
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "t" | "true" | "y"))
    };
    if flagged("bkgdtarg") {
        return "background".to_string();
    }
    if flagged("is_imprt") {
        return "imprint".to_string();
    }
    if flagged("is_psf") {
        return "psf".to_string();
    }
    if let Some(exp_type) = item.get_str("exp_type") {
        let exp_type = exp_type.to_ascii_lowercase();
        if exp_type.ends_with("_tacq") || exp_type.ends_with("_taconfirm") {
            return "target_acquisition".to_string();
        }
    }
    "science".to_string()
}

/// Default product name: the exposure's file stem with the calibration
/// suffix removed
pub fn default_product_name(item: &Item) -> String {
    let expname = item.expname();
    let stem = expname.rsplit_once('.').map_or(expname.as_str(), |(s, _)| s);
    for suffix in ["_rateints", "_rate", "_cal", "_uncal"] {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            return stripped.to_lowercase();
        }
    }
    stem.to_lowercase()
}

/// Registry preloaded with the built-in rule set, in offer order
pub fn standard_rules() -> Result<RuleRegistry> {
    let mut registry = RuleRegistry::new();
    registry.register(SlitNodRule)?;
    registry.register(WfssRule)?;
    registry.register(SpectralRule)?;
    registry.register(ImageRule)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_parses() {
        let schema = default_schema();
        assert!(schema.is_object());
    }

    #[test]
    fn test_item_role_markers() {
        let bkg = Item::builder()
            .attr("exp_type", "nrc_image")
            .attr("bkgdtarg", "T")
            .build();
        assert_eq!(default_item_role(&bkg), "background");

        let tacq = Item::builder().attr("exp_type", "nrs_tacq").build();
        assert_eq!(default_item_role(&tacq), "target_acquisition");

        let plain = Item::builder().attr("exp_type", "nrc_image").build();
        assert_eq!(default_item_role(&plain), "science");
    }

    #[test]
    fn test_product_name_strips_calibration_suffix() {
        let item = Item::builder()
            .attr("expname", "JW001_NRCA1_rate.fits")
            .build();
        assert_eq!(default_product_name(&item), "jw001_nrca1");

        let bare = Item::builder().attr("expname", "custom_exposure").build();
        assert_eq!(default_product_name(&bare), "custom_exposure");
    }

    #[test]
    fn test_standard_rules_register_cleanly() {
        let registry = standard_rules().unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("wfss").is_some());
    }
}
