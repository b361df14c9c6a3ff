//! Turns table operations into statements.
//!
//! Reads lower a filter and a selection into a select plus one batched
//! select per requested relation. Nested mutations are first planned into
//! an ordered list of primitive steps, then executed in one transaction.

mod claim;
pub(crate) use claim::claim;

pub(crate) mod exec;

pub(crate) mod filter;

pub(crate) mod hydrate;

mod plan;

pub(crate) mod planner;
pub(crate) use planner::Planner;

mod selection;
pub use selection::Selection;
