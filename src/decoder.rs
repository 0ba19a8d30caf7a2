//! Capstone-backed decoding engine.

use std::fmt;

use capstone::{Arch, Capstone, InsnGroupId, InsnId, RegId};

use crate::config::{EngineConfig, Mode, Syntax};
use crate::insn::Instruction;
use crate::{dispatch, sweep, Address, Architecture, Decoder, Disassembly, DisassemblyError};

/// Returned by the name lookups for ids the tables do not know.
pub const UNKNOWN_NAME: &str = "<unknown>";

/// A decoding engine for one (architecture, mode) pair.
///
/// The engine exclusively owns its Capstone handle. It is not `Sync`: share
/// it across threads only behind external locking, or open one engine per
/// worker (see [`crate::parallel`]). The handle is released by [`Engine::close`]
/// or, on every other exit path, when the engine is dropped.
pub struct Engine {
    cs: Capstone,
    config: EngineConfig,
}

impl Engine {
    /// Open an engine with default options.
    pub fn new(arch: Architecture, mode: Mode) -> Result<Self, DisassemblyError> {
        Self::with_config(EngineConfig::new(arch, mode))
    }

    /// Open an engine from a full configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self, DisassemblyError> {
        config.validate()?;

        let arch = match config.arch {
            Architecture::Arm => Arch::ARM,
            Architecture::Arm64 => Arch::ARM64,
            Architecture::Mips => Arch::MIPS,
            Architecture::X86 => Arch::X86,
        };

        let mut cs = Capstone::new_raw(
            arch,
            config.mode.to_capstone(),
            config.extra_modes().into_iter(),
            config.capstone_endian(),
        )?;
        cs.set_detail(true)?;
        if config.arch == Architecture::X86 {
            cs.set_syntax(match config.syntax {
                Syntax::Intel => capstone::Syntax::Intel,
                Syntax::Att => capstone::Syntax::Att,
            })?;
        }

        log::debug!("Opened {} engine in {} mode", config.arch, config.mode);

        Ok(Self { cs, config })
    }

    /// Release the decoder context.
    ///
    /// Consumes the engine, so it cannot be used afterwards.
    pub fn close(self) -> Result<(), DisassemblyError> {
        log::debug!("Closing {} engine", self.config.arch);
        drop(self.cs);
        Ok(())
    }

    /// Architecture the engine decodes
    pub fn architecture(&self) -> Architecture {
        self.config.arch
    }

    /// Mode selected at construction
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Full configuration the engine was opened with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Version of the decoder core as (major, minor).
    pub fn version() -> (u32, u32) {
        Capstone::lib_version()
    }

    /// Decode `code` as if loaded at `address`.
    ///
    /// # Arguments
    /// * `code` - The machine code to disassemble
    /// * `address` - Virtual address of `code[0]`
    /// * `count` - Maximum number of instructions, `0` for no limit. This is a
    ///   `usize` since it bounds a `Vec` and can never exceed `code.len()`.
    ///
    /// # Returns
    /// The instructions decoded before the end of `code`, the count limit, or
    /// the first undecodable unit, whichever comes first.
    pub fn disasm(&self, code: &[u8], address: Address, count: usize) -> Disassembly {
        sweep::run(self, code, address, count)
    }

    /// Name of register `reg`, or [`UNKNOWN_NAME`].
    pub fn register_name(&self, reg: u32) -> String {
        u16::try_from(reg)
            .ok()
            .and_then(|id| self.cs.reg_name(RegId(id)))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    /// Name of instruction id `insn`, or [`UNKNOWN_NAME`].
    pub fn instruction_name(&self, insn: u32) -> String {
        self.cs
            .insn_name(InsnId(insn))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    /// Name of group id `group`, or [`UNKNOWN_NAME`].
    pub fn group_name(&self, group: u32) -> String {
        u8::try_from(group)
            .ok()
            .and_then(|id| self.cs.group_name(InsnGroupId(id)))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }
}

impl Decoder for Engine {
    fn architecture(&self) -> Architecture {
        self.config.arch
    }

    fn decode(&self, code: &[u8], address: Address) -> Option<Instruction> {
        let insns = self.cs.disasm_count(code, address, 1).ok()?;
        let raw = insns.iter().next()?;

        match self.cs.insn_detail(raw) {
            Ok(detail) => dispatch::build(self.config.arch, raw, &detail),
            Err(err) => {
                log::warn!("No detail for instruction at 0x{:x}: {}", address, err);
                None
            }
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish()
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Engine::{}({})", self.config.arch, self.config.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::{ArmOperandKind, Condition, X86OperandKind};

    #[test]
    fn test_rejects_unsupported_mode() {
        let err = Engine::new(Architecture::X86, Mode::Thumb).unwrap_err();
        assert!(err.is_initialization());
        assert_eq!(
            err,
            DisassemblyError::UnsupportedMode {
                arch: Architecture::X86,
                mode: Mode::Thumb
            }
        );
        assert!(Engine::new(Architecture::Arm64, Mode::Mode64).is_err());
    }

    #[test]
    fn test_open_and_close() {
        let engine = Engine::new(Architecture::X86, Mode::Mode32).unwrap();
        assert_eq!(engine.architecture(), Architecture::X86);
        assert_eq!(engine.mode(), Mode::Mode32);
        assert_eq!(
            engine.config(),
            &EngineConfig::new(Architecture::X86, Mode::Mode32)
        );
        assert_eq!(engine.to_string(), "Engine::x86(32-bit)");
        engine.close().unwrap();
    }

    #[test]
    fn test_x86_decode_one() {
        // mov eax, 1
        let bytes = [0xb8, 0x01, 0x00, 0x00, 0x00];
        let engine = Engine::new(Architecture::X86, Mode::Mode32).unwrap();

        let insn = engine.decode(&bytes, 0x400).unwrap();
        assert_eq!(insn.mnemonic(), "mov");
        assert_eq!(insn.op_str(), "eax, 1");
        assert_eq!(insn.size(), 5);
        assert_eq!(insn.address(), 0x400);
        assert_eq!(insn.bytes(), &bytes);

        let detail = insn.detail.x86().unwrap();
        assert_eq!(detail.operands.len(), 2);
        assert_eq!(detail.operands[1].kind, X86OperandKind::Imm(1));
        let reg = detail.operands[0].reg().unwrap();
        assert_eq!(engine.register_name(reg), "eax");
    }

    #[test]
    fn test_truncated_input_does_not_decode() {
        let engine = Engine::new(Architecture::X86, Mode::Mode64).unwrap();
        assert!(engine.decode(&[0xb8, 0x01], 0).is_none());
        assert!(engine.decode(&[], 0).is_none());
    }

    #[test]
    fn test_arm_conditional_move() {
        // moveq r0, #1
        let engine = Engine::new(Architecture::Arm, Mode::Arm).unwrap();
        let insn = engine.decode(&[0x01, 0x00, 0xa0, 0x03], 0).unwrap();

        assert_eq!(insn.mnemonic(), "moveq");
        let detail = insn.detail.arm().unwrap();
        assert_eq!(detail.condition, Some(Condition::Eq));
        assert!(detail.is_conditional());
        assert_eq!(detail.operands[1].kind, ArmOperandKind::Imm(1));
    }

    #[test]
    fn test_name_lookups_are_total() {
        let engine = Engine::new(Architecture::Arm64, Mode::Arm).unwrap();
        assert_eq!(engine.register_name(u32::MAX), UNKNOWN_NAME);
        assert_eq!(engine.register_name(0), UNKNOWN_NAME);
        assert_eq!(engine.instruction_name(u32::MAX), UNKNOWN_NAME);
        assert_eq!(engine.group_name(1000), UNKNOWN_NAME);
    }

    #[test]
    fn test_version() {
        let (major, _minor) = Engine::version();
        assert!(major >= 4);
    }
}
