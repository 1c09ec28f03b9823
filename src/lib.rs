//! # asngen - Association generation for exposure pools
//!
//! Groups instrument exposures into processing associations by matching
//! each exposure's metadata against rule-defined constraint trees:
//!
//! - **Constraints**: attribute patterns, context guards, and composite
//!   groups that narrow as items match, so associations stay internally
//!   consistent
//! - **Rules**: pluggable variants describing one association flavor
//!   each (imaging, spectroscopy, dispersed pairs, nod patterns)
//! - **Engine**: a worklist driver that offers every item to every rule
//!   and drains reprocess requests to a fixpoint
//!
//! ## Core Principle
//!
//! > A rejected offer leaves no trace.
//!
//! Constraint evaluation is transactional: an item either merges into an
//! association together with all its binding side effects, or the
//! association is restored exactly as it was.
//!
//! ## Example
//!
//! ```rust
//! use asngen::{Item, MatchEngine, standard_rules};
//!
//! let pool = vec![
//!     Item::builder()
//!         .attr("expname", "jw001_00001_rate.fits")
//!         .attr("instrume", "nircam")
//!         .attr("exp_type", "nrc_image")
//!         .attr("targetid", "1")
//!         .attr("asn_pool", "pool_001")
//!         .build(),
//!     Item::builder()
//!         .attr("expname", "jw001_00002_rate.fits")
//!         .attr("instrume", "nircam")
//!         .attr("exp_type", "nrc_image")
//!         .attr("targetid", "1")
//!         .attr("asn_pool", "pool_001")
//!         .build(),
//! ];
//!
//! let engine = MatchEngine::new(standard_rules().unwrap());
//! let documents = engine.generate(&pool).unwrap();
//! assert_eq!(documents.len(), 1);
//! assert_eq!(documents[0].products[0].members.len(), 2);
//! ```

pub mod association;
pub mod constraint;
pub mod engine;
pub mod error;
pub mod io;
pub mod item;
pub mod registry;
pub mod rules;

// Re-export main types
pub use association::{
    AsnDocument, Association, DocumentValidator, Member, Product, ValidationIssue,
    ValidationResult,
};
pub use constraint::{
    AttrConstraint, Constraint, ConstraintGroup, EvalContext, EvalFacts, Expected,
    GuardConstraint, MatchPattern, ReduceOp, ReprocessOn, Verdict,
};
pub use engine::{Category, MatchEngine, ProcessQueue, ReprocessRequest};
pub use error::{AsnError, Result};
pub use io::{AsnFormat, IoRegistry, JsonFormat, YamlFormat};
pub use item::{Item, ItemBuilder, ItemId};
pub use registry::RuleRegistry;
pub use rules::{standard_rules, ImageRule, RuleVariant, SlitNodRule, SpectralRule, WfssRule};
