//! x86 operand model.

use capstone::arch::x86::{X86InsnDetail, X86OperandType};
use capstone::arch::DetailsArchInsn;
use serde::Serialize;

use super::{reg, RegId};

/// Memory reference `segment:[base + index * scale + disp]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct X86Memory {
    pub segment: Option<RegId>,
    pub base: Option<RegId>,
    pub index: Option<RegId>,
    pub scale: i32,
    pub disp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum X86OperandKind {
    Reg(RegId),
    Imm(i64),
    Mem(X86Memory),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct X86Operand {
    /// Operand size in bytes
    pub size: u8,
    pub kind: X86OperandKind,
    /// AVX-512 `{z}` zeroing
    pub avx_zero_opmask: bool,
}

impl X86Operand {
    pub fn reg(&self) -> Option<RegId> {
        match self.kind {
            X86OperandKind::Reg(r) => Some(r),
            _ => None,
        }
    }

    pub fn imm(&self) -> Option<i64> {
        match self.kind {
            X86OperandKind::Imm(v) => Some(v),
            _ => None,
        }
    }

    pub fn mem(&self) -> Option<&X86Memory> {
        match &self.kind {
            X86OperandKind::Mem(m) => Some(m),
            _ => None,
        }
    }
}

const PREFIX_LOCK: u8 = 0xf0;
const PREFIX_REPNE: u8 = 0xf2;
const PREFIX_REP: u8 = 0xf3;
const SEGMENT_PREFIXES: [u8; 6] = [0x2e, 0x36, 0x3e, 0x26, 0x64, 0x65];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct X86Detail {
    /// Prefix groups 1-4; `0` marks an absent group
    pub prefix: [u8; 4],
    /// Opcode bytes, zero padded
    pub opcode: [u8; 4],
    /// REX byte, `0` when absent
    pub rex: u8,
    /// Address size in bytes
    pub addr_size: u8,
    pub modrm: u8,
    pub sib: u8,
    pub disp: i64,
    pub sib_index: Option<RegId>,
    pub sib_scale: i8,
    pub sib_base: Option<RegId>,
    /// AVX suppress-all-exceptions
    pub avx_sae: bool,
    pub operands: Vec<X86Operand>,
}

impl X86Detail {
    pub fn has_lock(&self) -> bool {
        self.prefix[0] == PREFIX_LOCK
    }

    pub fn has_rep(&self) -> bool {
        self.prefix[0] == PREFIX_REP
    }

    pub fn has_repne(&self) -> bool {
        self.prefix[0] == PREFIX_REPNE
    }

    /// Segment override prefix byte, if any
    pub fn segment_override(&self) -> Option<u8> {
        Some(self.prefix[1]).filter(|p| SEGMENT_PREFIXES.contains(p))
    }

    pub fn has_rex(&self) -> bool {
        self.rex != 0
    }
}

pub(crate) fn decompose(detail: &X86InsnDetail<'_>) -> X86Detail {
    let operands = detail
        .operands()
        .map(|op| X86Operand {
            size: op.size,
            kind: match op.op_type {
                X86OperandType::Reg(r) => X86OperandKind::Reg(r.0 as RegId),
                X86OperandType::Imm(v) => X86OperandKind::Imm(v),
                X86OperandType::Mem(mem) => X86OperandKind::Mem(X86Memory {
                    segment: reg(mem.segment()),
                    base: reg(mem.base()),
                    index: reg(mem.index()),
                    scale: mem.scale(),
                    disp: mem.disp(),
                }),
                _ => X86OperandKind::Unknown,
            },
            avx_zero_opmask: op.avx_zero_opmask,
        })
        .collect();

    X86Detail {
        prefix: *detail.prefix(),
        opcode: *detail.opcode(),
        rex: detail.rex(),
        addr_size: detail.addr_size(),
        modrm: detail.modrm(),
        sib: detail.sib(),
        disp: detail.disp(),
        sib_index: reg(detail.sib_index()),
        sib_scale: detail.sib_scale(),
        sib_base: reg(detail.sib_base()),
        avx_sae: detail.avx_sae(),
        operands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_helpers() {
        let mut detail = X86Detail::default();
        assert!(!detail.has_lock());
        assert_eq!(detail.segment_override(), None);

        detail.prefix = [PREFIX_LOCK, 0x64, 0, 0];
        assert!(detail.has_lock());
        assert!(!detail.has_rep());
        assert_eq!(detail.segment_override(), Some(0x64));

        detail.prefix = [PREFIX_REP, 0, 0, 0];
        assert!(detail.has_rep());
        assert!(!detail.has_repne());
    }

    #[test]
    fn test_operand_accessors() {
        let op = X86Operand {
            size: 4,
            kind: X86OperandKind::Imm(-1),
            avx_zero_opmask: false,
        };
        assert_eq!(op.imm(), Some(-1));
        assert_eq!(op.reg(), None);
        assert!(op.mem().is_none());
    }
}
