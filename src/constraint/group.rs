//! Composite constraints
//!
//! An ordered collection of child constraints combined with a reduce
//! operator. The operator is a pure function of the children's boolean
//! results; child side effects are independent of which operator wraps
//! them because groups never short-circuit.

use super::Constraint;

/// Reduce operator over child results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// True iff every child is true
    All,
    /// True iff at least one child is true
    Any,
    /// True iff zero children are true
    NotAny,
    /// True iff at least one child is false
    NotAll,
}

impl ReduceOp {
    pub fn reduce(&self, results: &[bool]) -> bool {
        match self {
            ReduceOp::All => results.iter().all(|r| *r),
            ReduceOp::Any => results.iter().any(|r| *r),
            ReduceOp::NotAny => !results.iter().any(|r| *r),
            ReduceOp::NotAll => !results.iter().all(|r| *r),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceOp::All => "all",
            ReduceOp::Any => "any",
            ReduceOp::NotAny => "notany",
            ReduceOp::NotAll => "notall",
        }
    }
}

/// Ordered children combined with a reduce operator
#[derive(Debug, Clone)]
pub struct ConstraintGroup {
    children: Vec<Constraint>,
    op: ReduceOp,
}

impl ConstraintGroup {
    pub fn new(children: Vec<Constraint>, op: ReduceOp) -> Self {
        Self { children, op }
    }

    pub fn all(children: Vec<Constraint>) -> Self {
        Self::new(children, ReduceOp::All)
    }

    pub fn any(children: Vec<Constraint>) -> Self {
        Self::new(children, ReduceOp::Any)
    }

    pub fn notany(children: Vec<Constraint>) -> Self {
        Self::new(children, ReduceOp::NotAny)
    }

    pub fn notall(children: Vec<Constraint>) -> Self {
        Self::new(children, ReduceOp::NotAll)
    }

    pub fn op(&self) -> ReduceOp {
        self.op
    }

    pub fn children(&self) -> &[Constraint] {
        &self.children
    }

    pub(super) fn children_mut(&mut self) -> &mut [Constraint] {
        &mut self.children
    }
}
