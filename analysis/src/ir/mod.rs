//! Intermediate Representation (IR) consumed by the analyses
//!
//! A low-level, memory-form IR in the style of unoptimized compiler output:
//! scalars live in named allocation sites and are accessed through explicit
//! loads and stores, array elements through `GetElementPtr`.
//! The IR is:
//! - Explicit (every value has a defining instruction)
//! - Identity based (`IrId` is the operand identity the analyses compare)
//! - Serializable, so host tooling can hand a module over as JSON

pub mod types;
pub mod instructions;
pub mod blocks;
pub mod functions;
pub mod modules;
pub mod builder;
pub mod loop_analysis;
pub mod dump;

pub use types::*;
pub use instructions::*;
pub use blocks::*;
pub use functions::*;
pub use modules::*;
pub use builder::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for IR values (registers and allocation sites)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IrId(u32);

impl IrId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn invalid() -> Self {
        Self(u32::MAX)
    }

    pub fn is_valid(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}
