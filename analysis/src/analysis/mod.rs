//! Dataflow analyses over the IR
//!
//! - [`available_expressions`]: intraprocedural available-expressions analysis
//!   driven to a fixed point over the CFG.
//! - [`dependence`]: flow, anti and output dependences between array-element
//!   accesses of one loop body.
//!
//! Both analyses are pure functions of the input function plus an
//! [`AnalysisConfig`]; all mutable state lives in a context scoped to one call.

pub mod array_access;
pub mod available_expressions;
pub mod config;
pub mod dependence;
pub mod expr_set;
pub mod expression;
pub mod gen_kill;
pub mod index_eval;
pub mod report;
pub mod symbol_table;

pub use array_access::{Access, ArrayAccessRecord, ArraySlot, IndexValue};
pub use available_expressions::{analyze_function, AssignmentFacts, AvailableExpressionReport, InstId, VisitState};
pub use config::{AnalysisConfig, UnknownIndexPolicy};
pub use dependence::{analyze_loop, analyze_loops, classify, Classification, DependenceKind, DependencePair, DependenceReport, Verdict};
pub use expr_set::ExpressionSet;
pub use expression::{Expression, Operand};
pub use index_eval::{IndexError, IndexEvaluator};
pub use symbol_table::SymbolTable;

use diagnostics::ProgramPoint;
use crate::ir::{InstRef, IrFunction};
use thiserror::Error;

/// Errors that abort an analysis run.
///
/// Recoverable conditions (skipped records, unresolved indices) are reported
/// as diagnostics instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid control flow graph in '{function}': {reason}")]
    InvalidCfg { function: String, reason: String },

    #[error("function '{0}' not found in module")]
    FunctionNotFound(String),

    #[error("failed to read config file '{path}': {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid analysis config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Reject CFGs the analyses cannot walk.
pub(crate) fn verify_function(function: &IrFunction) -> Result<(), AnalysisError> {
    function
        .cfg
        .verify()
        .map_err(|reason| AnalysisError::InvalidCfg {
            function: function.name.clone(),
            reason,
        })
}

pub(crate) fn program_point(function: &IrFunction, at: InstRef) -> ProgramPoint {
    ProgramPoint::new(function.name.clone(), at.block.as_u32(), at.index)
}
