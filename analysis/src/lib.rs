//! Dataflow analyses over a memory-form IR
//!
//! - [`ir`]: the input model (functions, blocks, instructions) with a builder,
//!   JSON loading, dominators and natural loops.
//! - [`analysis`]: available expressions and loop dependence classification.
//! - [`logging`]: `env_logger` setup shared by the CLI and tests.

pub mod ir;
pub mod analysis;
pub mod logging;

pub use analysis::{
    analyze_function, analyze_loops, AnalysisConfig, AnalysisError, AvailableExpressionReport,
    DependenceReport, UnknownIndexPolicy,
};
