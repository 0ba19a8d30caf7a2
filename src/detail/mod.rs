//! Architecture-specific operand model.
//!
//! Every decoded instruction carries exactly one [`DetailRecord`]; which
//! variant is fixed by the engine's architecture.

pub mod arm;
pub mod arm64;
pub mod mips;
pub mod x86;

use serde::Serialize;

use crate::Architecture;

pub use self::arm::{ArmDetail, ArmOperand, ArmOperandKind, Condition};
pub use self::arm64::{Arm64Detail, Arm64Operand, Arm64OperandKind};
pub use self::mips::{MipsDetail, MipsOperand};
pub use self::x86::{X86Detail, X86Operand, X86OperandKind};

/// Register id in the architecture's register space. `0` is never valid.
pub type RegId = u32;

/// Converts a raw register id, mapping the invalid id `0` to `None`.
pub(crate) fn reg(raw: capstone::RegId) -> Option<RegId> {
    match raw.0 {
        0 => None,
        id => Some(id as RegId),
    }
}

/// Typed operand decomposition, one variant per architecture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "arch", rename_all = "lowercase")]
pub enum DetailRecord {
    Arm(ArmDetail),
    Arm64(Arm64Detail),
    Mips(MipsDetail),
    X86(X86Detail),
}

impl DetailRecord {
    /// Architecture this record belongs to
    pub fn architecture(&self) -> Architecture {
        match self {
            DetailRecord::Arm(_) => Architecture::Arm,
            DetailRecord::Arm64(_) => Architecture::Arm64,
            DetailRecord::Mips(_) => Architecture::Mips,
            DetailRecord::X86(_) => Architecture::X86,
        }
    }

    /// Number of explicit operands
    pub fn operand_count(&self) -> usize {
        match self {
            DetailRecord::Arm(d) => d.operands.len(),
            DetailRecord::Arm64(d) => d.operands.len(),
            DetailRecord::Mips(d) => d.operands.len(),
            DetailRecord::X86(d) => d.operands.len(),
        }
    }

    /// Number of operands that fell outside the typed operand taxonomy
    pub fn unknown_operand_count(&self) -> usize {
        match self {
            DetailRecord::Arm(d) => d
                .operands
                .iter()
                .filter(|op| op.kind == ArmOperandKind::Unknown)
                .count(),
            DetailRecord::Arm64(d) => d
                .operands
                .iter()
                .filter(|op| op.kind == Arm64OperandKind::Unknown)
                .count(),
            DetailRecord::Mips(d) => d
                .operands
                .iter()
                .filter(|op| **op == MipsOperand::Unknown)
                .count(),
            DetailRecord::X86(d) => d
                .operands
                .iter()
                .filter(|op| op.kind == X86OperandKind::Unknown)
                .count(),
        }
    }

    pub fn arm(&self) -> Option<&ArmDetail> {
        match self {
            DetailRecord::Arm(d) => Some(d),
            _ => None,
        }
    }

    pub fn arm64(&self) -> Option<&Arm64Detail> {
        match self {
            DetailRecord::Arm64(d) => Some(d),
            _ => None,
        }
    }

    pub fn mips(&self) -> Option<&MipsDetail> {
        match self {
            DetailRecord::Mips(d) => Some(d),
            _ => None,
        }
    }

    pub fn x86(&self) -> Option<&X86Detail> {
        match self {
            DetailRecord::X86(d) => Some(d),
            _ => None,
        }
    }
}
