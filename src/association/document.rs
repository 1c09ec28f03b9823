//! Association document types
//!
//! The serialization-boundary form of an association: a typed document
//! with explicit accessors, validated against a JSON schema before it
//! leaves the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One member exposure of an association product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// The exposure's file reference
    pub expname: String,
    /// Role of the exposure in the product (science, background, ...)
    pub exptype: String,
    /// Rule-specific extras carried through serialization untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Member {
    pub fn new(expname: impl Into<String>, exptype: impl Into<String>) -> Self {
        Self {
            expname: expname.into(),
            exptype: exptype.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// One product of an association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub members: Vec<Member>,
}

/// The association data structure handed to downstream processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsnDocument {
    /// Association type (e.g. `image2`), fixed by the rule variant
    pub asn_type: String,
    /// Name of the rule that produced this association
    pub asn_rule: String,
    /// Optional version tag woven into the association name
    pub version_id: Option<String>,
    /// Version of the generator that wrote the document
    pub code_version: String,
    /// Candidate identifier this association belongs to
    pub asn_id: String,
    /// Name of the pool the items came from
    pub asn_pool: String,
    pub products: Vec<Product>,
}

impl AsnDocument {
    pub fn new(
        asn_rule: impl Into<String>,
        asn_type: impl Into<String>,
        asn_id: impl Into<String>,
        asn_pool: impl Into<String>,
        version_id: Option<String>,
    ) -> Self {
        Self {
            asn_type: asn_type.into(),
            asn_rule: asn_rule.into(),
            version_id,
            code_version: env!("CARGO_PKG_VERSION").to_string(),
            asn_id: asn_id.into(),
            asn_pool: asn_pool.into(),
            products: Vec::new(),
        }
    }

    /// Append a member to the association's product, creating the product
    /// with the given name on first use
    pub fn add_member(&mut self, product_name: &str, member: Member) {
        if self.products.is_empty() {
            self.products.push(Product {
                name: product_name.to_string(),
                members: Vec::new(),
            });
        }
        self.products[0].members.push(member);
    }

    /// All members across all products
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.products.iter().flat_map(|p| p.members.iter())
    }

    pub fn member_count(&self) -> usize {
        self.products.iter().map(|p| p.members.len()).sum()
    }

    /// True if any member carries the `science` role
    pub fn has_science(&self) -> bool {
        self.members().any(|m| m.exptype == "science")
    }

    /// Name of the first product, if one exists
    pub fn product_name(&self) -> Option<&str> {
        self.products.first().map(|p| p.name.as_str())
    }

    /// JSON value rendering, used for schema validation
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
