//! This crate provides the specification side of DICOM data set validation:
//! the attribute dictionary index,
//! the IOD and module requirement tables,
//! and the parser which turns the standard's English
//! _"Required if …"_ clauses into executable condition trees.
//!
//! The dictionaries and requirement tables are loaded once from JSON
//! (as produced by a standard reader)
//! and are immutable afterwards,
//! so they can be freely shared across threads.
//! Condition trees are built lazily from their source text
//! and memoized in a [`ConditionCache`].
//!
//! Evaluating conditions against a data set
//! and producing validation reports
//! is the responsibility of the `dicom-validator` crate.
pub mod condition;
pub mod dictionary;
pub mod iod;

pub use crate::condition::{
    AttributeTest, Condition, ConditionCache, ConditionKind, ConditionParser, Operator, Predicate,
};
pub use crate::dictionary::{AttributeRecord, DictionaryIndex};
pub use crate::iod::{AttributeRequirement, AttributeType, IodSpec, ModuleSpec, ModuleUsage};
