//! MIPS operand model.

use capstone::arch::mips::{self as cs_mips, MipsInsnDetail};
use capstone::arch::DetailsArchInsn;
use serde::Serialize;

use super::{reg, RegId};

/// Memory reference `disp(base)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MipsMemory {
    pub base: Option<RegId>,
    pub disp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MipsOperand {
    Reg(RegId),
    Imm(i64),
    Mem(MipsMemory),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MipsDetail {
    pub operands: Vec<MipsOperand>,
}

impl MipsDetail {
    /// The memory operand of a load or store
    pub fn memory(&self) -> Option<&MipsMemory> {
        self.operands.iter().find_map(|op| match op {
            MipsOperand::Mem(mem) => Some(mem),
            _ => None,
        })
    }
}

pub(crate) fn decompose(detail: &MipsInsnDetail<'_>) -> MipsDetail {
    let operands = detail
        .operands()
        .map(|op| match op {
            cs_mips::MipsOperand::Reg(r) => MipsOperand::Reg(r.0 as RegId),
            cs_mips::MipsOperand::Imm(v) => MipsOperand::Imm(v),
            cs_mips::MipsOperand::Mem(mem) => MipsOperand::Mem(MipsMemory {
                base: reg(mem.base()),
                disp: mem.disp(),
            }),
            _ => MipsOperand::Unknown,
        })
        .collect();

    MipsDetail { operands }
}
