//! Threshold policy turning a classifier score into a verdict.

mod policy;

pub use policy::{DecisionPolicy, Verdict};
