//! Weak-equivalence checking of an MCNP geometry against its Tripoli-4
//! conversion, driven by the points MCNP recorded in its PTRAC output.

pub mod common;
pub mod domain;
pub mod driver;
pub mod geometry;
pub mod mcnp;
pub mod oracle;
pub mod ptrac;
pub mod serialization;
pub mod statistics;

pub use common::OracleConfig;
pub use domain::{OracleError, OracleErrorCategory, OracleResult, Outcome, PtracFormat, PtracRecord};
pub use driver::run_comparison;
