//! AArch64 operand model.

use capstone::arch::arm64::{self as cs_arm64, Arm64InsnDetail, Arm64OperandType};
use capstone::arch::DetailsArchInsn;
use serde::Serialize;

use super::{reg, Condition, RegId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm64Shift {
    Lsl(u32),
    Msl(u32),
    Lsr(u32),
    Asr(u32),
    Ror(u32),
}

impl Arm64Shift {
    fn from_capstone(shift: cs_arm64::Arm64Shift) -> Option<Arm64Shift> {
        use cs_arm64::Arm64Shift as S;

        Some(match shift {
            S::Lsl(n) => Arm64Shift::Lsl(n),
            S::Msl(n) => Arm64Shift::Msl(n),
            S::Lsr(n) => Arm64Shift::Lsr(n),
            S::Asr(n) => Arm64Shift::Asr(n),
            S::Ror(n) => Arm64Shift::Ror(n),
            _ => return None,
        })
    }
}

/// Register extension applied before use (`uxtw`, `sxtx`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Extender {
    Uxtb,
    Uxth,
    Uxtw,
    Uxtx,
    Sxtb,
    Sxth,
    Sxtw,
    Sxtx,
}

impl Extender {
    /// Maps the engine's extender numbering; `0` is "no extension".
    pub fn from_raw(raw: u32) -> Option<Extender> {
        Some(match raw {
            1 => Extender::Uxtb,
            2 => Extender::Uxth,
            3 => Extender::Uxtw,
            4 => Extender::Uxtx,
            5 => Extender::Sxtb,
            6 => Extender::Sxth,
            7 => Extender::Sxtw,
            8 => Extender::Sxtx,
            _ => return None,
        })
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Extender::Sxtb | Extender::Sxth | Extender::Sxtw | Extender::Sxtx
        )
    }
}

/// Vector arrangement such as `.4s`: lane count times lane width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VectorArrangement {
    pub lanes: u8,
    pub lane_bits: u16,
}

impl VectorArrangement {
    /// Maps the engine's arrangement numbering; `0` is "not a vector".
    pub fn from_raw(raw: u32) -> Option<VectorArrangement> {
        let (lanes, lane_bits) = match raw {
            1 => (16, 8),
            2 => (8, 8),
            3 => (4, 8),
            4 => (1, 8),
            5 => (8, 16),
            6 => (4, 16),
            7 => (2, 16),
            8 => (1, 16),
            9 => (4, 32),
            10 => (2, 32),
            11 => (1, 32),
            12 => (2, 64),
            13 => (1, 64),
            14 => (1, 128),
            _ => return None,
        };
        Some(VectorArrangement { lanes, lane_bits })
    }

    /// Register width in bits covered by the arrangement
    pub fn total_bits(&self) -> u32 {
        self.lanes as u32 * self.lane_bits as u32
    }
}

/// Memory reference `[base, index]` / `[base, #disp]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Arm64Memory {
    pub base: Option<RegId>,
    pub index: Option<RegId>,
    pub disp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arm64OperandKind {
    Reg(RegId),
    Imm(i64),
    CImm(i64),
    Fp(f64),
    Mem(Arm64Memory),
    /// MRS/MSR system register
    SysReg,
    /// PSTATE field
    Pstate,
    /// SYS instruction operation (`ic`, `dc`, `at`, `tlbi`)
    Sys,
    /// PRFM operation. The bundled engine reports `prfm` with only its
    /// memory operand, so this kind is not produced for it today.
    Prefetch,
    /// DMB/DSB/ISB option
    Barrier,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arm64Operand {
    pub kind: Arm64OperandKind,
    pub shift: Option<Arm64Shift>,
    pub extender: Option<Extender>,
    pub arrangement: Option<VectorArrangement>,
    pub vector_index: Option<u32>,
}

impl Arm64Operand {
    pub fn new(kind: Arm64OperandKind) -> Self {
        Self {
            kind,
            shift: None,
            extender: None,
            arrangement: None,
            vector_index: None,
        }
    }

    pub fn reg(&self) -> Option<RegId> {
        match self.kind {
            Arm64OperandKind::Reg(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_vector(&self) -> bool {
        self.arrangement.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Arm64Detail {
    pub condition: Option<Condition>,
    pub update_flags: bool,
    pub writeback: bool,
    pub operands: Vec<Arm64Operand>,
}

impl Arm64Detail {
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some_and(|cc| !cc.is_unconditional())
    }

    /// Widest lane count among the vector operands, if any
    pub fn max_lanes(&self) -> Option<u8> {
        self.operands
            .iter()
            .filter_map(|op| op.arrangement)
            .map(|a| a.lanes)
            .max()
    }
}

pub(crate) fn decompose(detail: &Arm64InsnDetail<'_>) -> Arm64Detail {
    let operands = detail
        .operands()
        .map(|op| Arm64Operand {
            kind: operand_kind(op.op_type),
            shift: Arm64Shift::from_capstone(op.shift),
            extender: Extender::from_raw(op.ext as u32),
            arrangement: VectorArrangement::from_raw(op.vas as u32),
            vector_index: op.vector_index,
        })
        .collect();

    Arm64Detail {
        condition: Condition::from_raw(detail.cc() as u32),
        update_flags: detail.update_flags(),
        writeback: detail.writeback(),
        operands,
    }
}

fn operand_kind(op_type: Arm64OperandType) -> Arm64OperandKind {
    match op_type {
        Arm64OperandType::Reg(r) => Arm64OperandKind::Reg(r.0 as RegId),
        Arm64OperandType::Imm(v) => Arm64OperandKind::Imm(v),
        Arm64OperandType::Cimm(v) => Arm64OperandKind::CImm(v),
        Arm64OperandType::Fp(v) => Arm64OperandKind::Fp(v),
        Arm64OperandType::Mem(mem) => Arm64OperandKind::Mem(Arm64Memory {
            base: reg(mem.base()),
            index: reg(mem.index()),
            disp: mem.disp(),
        }),
        Arm64OperandType::RegMrs(_) | Arm64OperandType::RegMsr(_) => Arm64OperandKind::SysReg,
        Arm64OperandType::Pstate(_) => Arm64OperandKind::Pstate,
        Arm64OperandType::Sys(_) => Arm64OperandKind::Sys,
        Arm64OperandType::Prefetch(_) => Arm64OperandKind::Prefetch,
        Arm64OperandType::Barrier(_) => Arm64OperandKind::Barrier,
        _ => Arm64OperandKind::Unknown,
    }
}
