//! ## Crate layout
//! - `core`: expression arena, compilers, partitioner and chain parser.
//! - `error`: the public error type every core error maps into.
//!
//! The `prelude` module carries the vocabulary needed to build a host query
//! tree and parse it into a plan.

pub use odq_core as core;

pub mod error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        core::{
            chain::QueryParameters,
            config::CompilerConfig,
            library::queryable,
            prelude::*,
        },
        error::{Error, ErrorKind},
    };
}
