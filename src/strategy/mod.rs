//! Strategy and feature types.
//!
//! Defines the Rust types that mirror the verification schema stored in a
//! feature's frontmatter, and the result type every executor produces.

mod check;
mod document;
mod feature;
mod result;
mod verification;

pub use check::{FileCheck, SizeConstraint};
pub use document::{parse_feature_document, FeatureDocument};
pub use feature::{Feature, FeatureStatus};
pub use result::{Details, FailureReason, StrategyResult};
pub use verification::{
    AiMode, AiStrategy, CommandStrategy, CompositeOperator, CompositeStrategy, FileStrategy,
    HttpStrategy, JsonAssertion, ManualStrategy, OneOrMany, OutputExpectations, ProcessOptions,
    ScriptStrategy, StrategyKind, TestStrategy, VerificationStrategy,
};
