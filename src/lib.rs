//! Core records, traits, and dispatch for the multidis disassembler.
//!
//! This library decodes flat machine-code buffers for ARM, AArch64, MIPS and
//! x86 into structured instruction records: a generic header (mnemonic,
//! operand text, implicit register reads/writes, groups) plus one typed,
//! architecture-specific operand decomposition. Decoding is driven by the
//! Capstone engine.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use multidis::{decoder::Engine, Architecture, Mode};
//!
//! // push rbp; mov rbp, rsp; ret
//! let code = [0x55, 0x48, 0x89, 0xe5, 0xc3];
//!
//! let engine = Engine::new(Architecture::X86, Mode::Mode64).unwrap();
//! let disassembly = engine.disasm(&code, 0x1000, 0);
//!
//! for insn in disassembly.iter() {
//!     println!("0x{:x}: {}", insn.address(), insn);
//! }
//!
//! // Decoding stops at the first undecodable unit and keeps what came before it.
//! if let Some(err) = disassembly.error {
//!     println!("stopped after {} bytes", err.bytes_consumed);
//! }
//!
//! engine.close().unwrap();
//! ```

pub mod config;
pub mod decoder;
pub mod detail;
mod dispatch;
pub mod format;
pub mod insn;
pub mod parallel;
pub mod sweep;

/// Represents an address in memory
pub type Address = u64;

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use crate::config::{EngineConfig, Endian, Mode, Syntax};
pub use crate::decoder::Engine;
pub use crate::detail::DetailRecord;
pub use crate::insn::{Instruction, InstructionHeader};

/// Supported architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// ARM (32-bit), ARM and Thumb instruction sets
    Arm,
    /// AArch64 (ARM 64-bit)
    Arm64,
    /// MIPS
    Mips,
    /// x86 (16, 32 and 64-bit)
    X86,
}

impl Architecture {
    /// Every architecture compiled into the core.
    pub fn all() -> &'static [Architecture] {
        &[
            Architecture::Arm,
            Architecture::Arm64,
            Architecture::Mips,
            Architecture::X86,
        ]
    }

    /// The mode used when a caller does not pick one.
    pub fn default_mode(&self) -> Mode {
        match self {
            Architecture::Arm => Mode::Arm,
            Architecture::Arm64 => Mode::Arm,
            Architecture::Mips => Mode::Mips32,
            Architecture::X86 => Mode::Mode64,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Arm => write!(f, "ARM"),
            Architecture::Arm64 => write!(f, "AArch64"),
            Architecture::Mips => write!(f, "MIPS"),
            Architecture::X86 => write!(f, "x86"),
        }
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm" | "armv7" => Ok(Architecture::Arm),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "mips" => Ok(Architecture::Mips),
            "x86" | "i386" | "x86_64" | "amd64" => Ok(Architecture::X86),
            _ => Err(format!("Unknown architecture: {}", s)),
        }
    }
}

/// Decoder trait: decodes exactly one instruction per call.
///
/// The sweep in [`sweep::run`] drives implementors step by step, so an
/// implementation only has to recognise the instruction at the start of `code`.
pub trait Decoder {
    /// Architecture whose detail records this decoder produces.
    fn architecture(&self) -> Architecture;

    /// Decode ONE instruction at the start of `code`, reporting it at `address`.
    ///
    /// # Returns
    /// Some(Instruction) if the leading bytes form a valid instruction, None otherwise
    fn decode(&self, code: &[u8], address: Address) -> Option<Instruction>;
}

/// Why a sweep stopped before the end of its buffer.
///
/// Carried next to the partial result in [`Disassembly`]; callers that want to
/// resync re-invoke decoding past `bytes_consumed` themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Invalid instruction at 0x{address:x} after {instructions} instructions ({bytes_consumed} bytes)")]
pub struct DecodeError {
    /// Number of instructions decoded before the failure
    pub instructions: usize,
    /// Number of bytes consumed before the failure
    pub bytes_consumed: usize,
    /// Address of the first undecodable byte
    pub address: Address,
}

/// Result of one decode call: everything decoded plus an optional stop reason.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Disassembly {
    /// Instructions in decode order
    pub instructions: Vec<Instruction>,
    /// Set when decoding stopped on an undecodable unit
    pub error: Option<DecodeError>,
}

impl Disassembly {
    /// Get the total number of instructions
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Total size in bytes of the decoded instructions
    pub fn bytes_consumed(&self) -> usize {
        self.instructions.iter().map(|i| i.size() as usize).sum()
    }

    /// True when decoding did not stop on an undecodable unit
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Iterate over the decoded instructions
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Collapse into all-or-nothing form, dropping the partial payload on error.
    pub fn into_result(self) -> Result<Vec<Instruction>, DisassemblyError> {
        match self.error {
            Some(err) => Err(DisassemblyError::DecodeError(err)),
            None => Ok(self.instructions),
        }
    }
}

impl<'a> IntoIterator for &'a Disassembly {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// Error type for disassembly operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DisassemblyError {
    /// Mode not valid for the architecture
    #[error("Unsupported mode {mode} for architecture {arch}")]
    UnsupportedMode { arch: Architecture, mode: Mode },

    /// Configuration option not valid for the architecture
    #[error("Option '{option}' is not supported for architecture {arch}")]
    UnsupportedOption { arch: Architecture, option: &'static str },

    /// The decoder context could not be created
    #[error("Failed to initialize decoder: {0}")]
    InitializationError(String),

    /// The decoder context could not be released
    #[error("Failed to release decoder: {0}")]
    ResourceError(String),

    /// Decoding stopped on an undecodable unit
    #[error(transparent)]
    DecodeError(#[from] DecodeError),

    /// Listing serialization failed
    #[error("Failed to format output: {0}")]
    FormatError(String),
}

impl DisassemblyError {
    /// True for every error that aborts engine construction
    pub fn is_initialization(&self) -> bool {
        matches!(
            self,
            DisassemblyError::UnsupportedMode { .. }
                | DisassemblyError::UnsupportedOption { .. }
                | DisassemblyError::InitializationError(_)
        )
    }
}

impl From<capstone::Error> for DisassemblyError {
    fn from(err: capstone::Error) -> Self {
        DisassemblyError::InitializationError(err.to_string())
    }
}
