//! ARM (A32/T32) operand model.

use capstone::arch::arm::{self as cs_arm, ArmInsnDetail, ArmOperandType};
use capstone::arch::DetailsArchInsn;
use serde::Serialize;

use super::{reg, RegId};
use crate::config::Endian;

/// Condition code shared by ARM and AArch64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Eq,
    Ne,
    Hs,
    Lo,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
    Nv,
}

impl Condition {
    /// Maps the engine's condition numbering; `0` is "no condition".
    pub fn from_raw(raw: u32) -> Option<Condition> {
        Some(match raw {
            1 => Condition::Eq,
            2 => Condition::Ne,
            3 => Condition::Hs,
            4 => Condition::Lo,
            5 => Condition::Mi,
            6 => Condition::Pl,
            7 => Condition::Vs,
            8 => Condition::Vc,
            9 => Condition::Hi,
            10 => Condition::Ls,
            11 => Condition::Ge,
            12 => Condition::Lt,
            13 => Condition::Gt,
            14 => Condition::Le,
            15 => Condition::Al,
            16 => Condition::Nv,
            _ => return None,
        })
    }

    /// True for the always-execute conditions
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Condition::Al | Condition::Nv)
    }

    /// Condition with the opposite outcome
    pub fn invert(&self) -> Condition {
        match self {
            Condition::Eq => Condition::Ne,
            Condition::Ne => Condition::Eq,
            Condition::Hs => Condition::Lo,
            Condition::Lo => Condition::Hs,
            Condition::Mi => Condition::Pl,
            Condition::Pl => Condition::Mi,
            Condition::Vs => Condition::Vc,
            Condition::Vc => Condition::Vs,
            Condition::Hi => Condition::Ls,
            Condition::Ls => Condition::Hi,
            Condition::Ge => Condition::Lt,
            Condition::Lt => Condition::Ge,
            Condition::Gt => Condition::Le,
            Condition::Le => Condition::Gt,
            Condition::Al => Condition::Nv,
            Condition::Nv => Condition::Al,
        }
    }
}

/// Shift applied to an operand, by immediate or by register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmShift {
    Asr(u32),
    Lsl(u32),
    Lsr(u32),
    Ror(u32),
    Rrx(u32),
    AsrReg(RegId),
    LslReg(RegId),
    LsrReg(RegId),
    RorReg(RegId),
    RrxReg(RegId),
}

impl ArmShift {
    fn from_capstone(shift: cs_arm::ArmShift) -> Option<ArmShift> {
        use cs_arm::ArmShift as S;

        Some(match shift {
            S::Invalid => return None,
            S::Asr(n) => ArmShift::Asr(n),
            S::Lsl(n) => ArmShift::Lsl(n),
            S::Lsr(n) => ArmShift::Lsr(n),
            S::Ror(n) => ArmShift::Ror(n),
            S::Rrx(n) => ArmShift::Rrx(n),
            S::AsrReg(r) => ArmShift::AsrReg(r.0 as RegId),
            S::LslReg(r) => ArmShift::LslReg(r.0 as RegId),
            S::LsrReg(r) => ArmShift::LsrReg(r.0 as RegId),
            S::RorReg(r) => ArmShift::RorReg(r.0 as RegId),
            S::RrxReg(r) => ArmShift::RrxReg(r.0 as RegId),
        })
    }
}

/// Memory reference `[base, index, lsl #scale]` / `[base, #disp]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArmMemory {
    pub base: Option<RegId>,
    pub index: Option<RegId>,
    /// `1` adds the index, `-1` subtracts it
    pub scale: i32,
    pub disp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmOperandKind {
    Reg(RegId),
    /// System register (MSR/MRS)
    SysReg(RegId),
    Imm(i32),
    /// Coprocessor register number
    CImm(i32),
    /// Coprocessor number
    PImm(i32),
    Fp(f64),
    Mem(ArmMemory),
    Setend(Endian),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArmOperand {
    pub kind: ArmOperandKind,
    pub shift: Option<ArmShift>,
    /// Lane index for `d0[1]`-style scalars
    pub vector_index: Option<u32>,
    /// Register is subtracted from the base (`[r0, -r1]`)
    pub subtracted: bool,
}

impl ArmOperand {
    pub fn new(kind: ArmOperandKind) -> Self {
        Self {
            kind,
            shift: None,
            vector_index: None,
            subtracted: false,
        }
    }

    /// Register id for plain register operands
    pub fn reg(&self) -> Option<RegId> {
        match self.kind {
            ArmOperandKind::Reg(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ArmDetail {
    /// `None` when the instruction carries no condition field
    pub condition: Option<Condition>,
    /// Sets the flags (`adds`, `movs`, ...)
    pub update_flags: bool,
    /// Base register written back (`!` or post-index)
    pub writeback: bool,
    /// LDM/STM user-mode registers (`^`)
    pub usermode: bool,
    /// NEON element size in bits, 0 when not a vector instruction
    pub vector_size: i32,
    pub operands: Vec<ArmOperand>,
}

impl ArmDetail {
    /// True when execution depends on the flags
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some_and(|cc| !cc.is_unconditional())
    }
}

pub(crate) fn decompose(detail: &ArmInsnDetail<'_>) -> ArmDetail {
    let operands = detail
        .operands()
        .map(|op| ArmOperand {
            kind: operand_kind(op.op_type),
            shift: ArmShift::from_capstone(op.shift),
            vector_index: op.vector_index,
            subtracted: op.subtracted,
        })
        .collect();

    ArmDetail {
        condition: Condition::from_raw(detail.cc() as u32),
        update_flags: detail.update_flags(),
        writeback: detail.writeback(),
        usermode: detail.usermode(),
        vector_size: detail.vector_size(),
        operands,
    }
}

fn operand_kind(op_type: ArmOperandType) -> ArmOperandKind {
    match op_type {
        ArmOperandType::Reg(r) => ArmOperandKind::Reg(r.0 as RegId),
        ArmOperandType::SysReg(r) => ArmOperandKind::SysReg(r.0 as RegId),
        ArmOperandType::Imm(v) => ArmOperandKind::Imm(v),
        ArmOperandType::Cimm(v) => ArmOperandKind::CImm(v),
        ArmOperandType::Pimm(v) => ArmOperandKind::PImm(v),
        ArmOperandType::Fp(v) => ArmOperandKind::Fp(v),
        ArmOperandType::Mem(mem) => ArmOperandKind::Mem(ArmMemory {
            base: reg(mem.base()),
            index: reg(mem.index()),
            scale: mem.scale(),
            disp: mem.disp(),
        }),
        ArmOperandType::Setend(endian) => setend(endian as u32),
        _ => ArmOperandKind::Unknown,
    }
}

/// `1` is big-endian and `2` little-endian; `0` is the engine's invalid value.
fn setend(raw: u32) -> ArmOperandKind {
    match raw {
        1 => ArmOperandKind::Setend(Endian::Big),
        2 => ArmOperandKind::Setend(Endian::Little),
        _ => ArmOperandKind::Unknown,
    }
}
