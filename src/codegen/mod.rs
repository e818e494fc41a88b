//! Pants middle end: AST → IR → CPS
//!
//! 1. Convert the AST into flat IR (one call per statement, fresh
//!    temporaries for intermediate values)
//! 2. Transform the IR into continuation-passing style
//! 3. Clean up local bindings the CPS expression never reads

pub mod cleanup;
pub mod convert;
pub mod cps;
pub mod cps_transform;
pub mod ir;

pub use cleanup::{cleanup, Cleanup, RemovedDefinition};
pub use convert::{convert, ConversionError, ConvertResult};
pub use cps_transform::{transform, CPSTransformer, TransformResult, TransformationError};
pub use ir::{Identifier, NameGen};
