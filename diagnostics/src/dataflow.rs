//! Dataflow-specific diagnostic builders
//!
//! Helper constructors for the recoverable conditions the analyses report.

use crate::{Diagnostic, DiagnosticBuilder, ProgramPoint};

/// Array store skipped because it does not have the element-assignment shape.
pub const MALFORMED_ARRAY_STORE: &str = "W0101";
/// Array index could not be folded to an integer.
pub const UNRESOLVED_INDEX: &str = "W0102";
/// Assignment never reached from the entry block.
pub const UNREACHABLE_ASSIGNMENT: &str = "W0103";

/// Provides common dataflow diagnostic builders
pub struct DataflowDiagnostics;

impl DataflowDiagnostics {
    /// A store inside a loop body was skipped during record extraction
    pub fn malformed_array_store(at: ProgramPoint, reason: &str) -> Diagnostic {
        DiagnosticBuilder::warning(format!("skipped array store: {}", reason))
            .code(MALFORMED_ARRAY_STORE)
            .at(at)
            .note("the store takes no part in dependence classification")
            .build()
    }

    /// An index operand folded to "unknown"
    pub fn unresolved_index(at: ProgramPoint, array: &str, reason: &str) -> Diagnostic {
        DiagnosticBuilder::warning(format!("index into '{}' is unknown: {}", array, reason))
            .code(UNRESOLVED_INDEX)
            .at(at)
            .help("comparisons against this index are reported as undetermined")
            .build()
    }

    /// An assignment the propagation driver never reached
    pub fn unreachable_assignment(at: ProgramPoint, target: &str) -> Diagnostic {
        DiagnosticBuilder::info(format!("assignment to '{}' is unreachable", target))
            .code(UNREACHABLE_ASSIGNMENT)
            .at(at)
            .build()
    }
}
