//! Architecture dispatch: raw decoded unit to [`Instruction`].

use capstone::arch::ArchDetail;
use capstone::{Insn, InsnDetail};

use crate::detail::{self, DetailRecord};
use crate::insn::{until_sentinel, Instruction, InstructionHeader};
use crate::Architecture;

/// Fill the architecture-independent header.
pub fn fill_header(raw: &Insn<'_>, insn_detail: &InsnDetail<'_>) -> InstructionHeader {
    InstructionHeader {
        id: raw.id().0,
        address: raw.address(),
        size: raw.len() as u16,
        bytes: raw.bytes().to_vec(),
        mnemonic: raw.mnemonic().unwrap_or("").to_string(),
        op_str: raw.op_str().unwrap_or("").to_string(),
        regs_read: until_sentinel(insn_detail.regs_read().iter().map(|r| r.0)),
        regs_write: until_sentinel(insn_detail.regs_write().iter().map(|r| r.0)),
        groups: until_sentinel(insn_detail.groups().iter().map(|g| g.0)),
    }
}

/// Decompose the raw operands for `arch`.
///
/// Returns `None` when the engine handed back details for a different
/// architecture, which only happens if the handle was opened inconsistently.
pub fn decompose(arch: Architecture, arch_detail: &ArchDetail<'_>) -> Option<DetailRecord> {
    match arch {
        Architecture::Arm => arch_detail
            .arm()
            .map(|d| DetailRecord::Arm(detail::arm::decompose(d))),
        Architecture::Arm64 => arch_detail
            .arm64()
            .map(|d| DetailRecord::Arm64(detail::arm64::decompose(d))),
        Architecture::Mips => arch_detail
            .mips()
            .map(|d| DetailRecord::Mips(detail::mips::decompose(d))),
        Architecture::X86 => arch_detail
            .x86()
            .map(|d| DetailRecord::X86(detail::x86::decompose(d))),
    }
}

/// Build the full record for one raw unit.
pub fn build(arch: Architecture, raw: &Insn<'_>, insn_detail: &InsnDetail<'_>) -> Option<Instruction> {
    let record = decompose(arch, &insn_detail.arch_detail())?;
    Some(Instruction {
        header: fill_header(raw, insn_detail),
        detail: record,
    })
}
