//! Engine configuration: modes, endianness, syntax and the support table.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{Architecture, DisassemblyError};

/// Sub-configuration of an architecture.
///
/// `Arm` is shared by ARM and AArch64, matching the underlying engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// 32-bit ARM instruction set, or the only AArch64 mode
    Arm,
    /// ARM Thumb and Thumb-2
    Thumb,
    /// MIPS32
    Mips32,
    /// MIPS64
    Mips64,
    /// MIPS II
    Mips2,
    /// MIPS III
    Mips3,
    /// MIPS32 Release 6
    Mips32R6,
    /// 16-bit x86
    Mode16,
    /// 32-bit x86
    Mode32,
    /// 64-bit x86
    Mode64,
}

impl Mode {
    /// Validation table: whether `arch` accepts this mode.
    pub fn is_supported_by(&self, arch: Architecture) -> bool {
        matches!(
            (arch, self),
            (Architecture::Arm, Mode::Arm | Mode::Thumb)
                | (Architecture::Arm64, Mode::Arm)
                | (
                    Architecture::Mips,
                    Mode::Mips32 | Mode::Mips64 | Mode::Mips2 | Mode::Mips3 | Mode::Mips32R6
                )
                | (Architecture::X86, Mode::Mode16 | Mode::Mode32 | Mode::Mode64)
        )
    }

    /// Every supported (architecture, mode) pair.
    pub fn supported_pairs() -> Vec<(Architecture, Mode)> {
        let modes = [
            Mode::Arm,
            Mode::Thumb,
            Mode::Mips32,
            Mode::Mips64,
            Mode::Mips2,
            Mode::Mips3,
            Mode::Mips32R6,
            Mode::Mode16,
            Mode::Mode32,
            Mode::Mode64,
        ];
        Architecture::all()
            .iter()
            .flat_map(|arch| {
                modes
                    .iter()
                    .filter(move |mode| mode.is_supported_by(*arch))
                    .map(move |mode| (*arch, *mode))
            })
            .collect()
    }

    pub(crate) fn to_capstone(self) -> capstone::Mode {
        match self {
            Mode::Arm => capstone::Mode::Arm,
            Mode::Thumb => capstone::Mode::Thumb,
            Mode::Mips32 => capstone::Mode::Mips32,
            Mode::Mips64 => capstone::Mode::Mips64,
            Mode::Mips2 => capstone::Mode::Mips2,
            Mode::Mips3 => capstone::Mode::Mips3,
            Mode::Mips32R6 => capstone::Mode::Mips32R6,
            Mode::Mode16 => capstone::Mode::Mode16,
            Mode::Mode32 => capstone::Mode::Mode32,
            Mode::Mode64 => capstone::Mode::Mode64,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Arm => write!(f, "arm"),
            Mode::Thumb => write!(f, "thumb"),
            Mode::Mips32 => write!(f, "mips32"),
            Mode::Mips64 => write!(f, "mips64"),
            Mode::Mips2 => write!(f, "mips2"),
            Mode::Mips3 => write!(f, "mips3"),
            Mode::Mips32R6 => write!(f, "mips32r6"),
            Mode::Mode16 => write!(f, "16-bit"),
            Mode::Mode32 => write!(f, "32-bit"),
            Mode::Mode64 => write!(f, "64-bit"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm" => Ok(Mode::Arm),
            "thumb" => Ok(Mode::Thumb),
            "mips32" => Ok(Mode::Mips32),
            "mips64" => Ok(Mode::Mips64),
            "mips2" => Ok(Mode::Mips2),
            "mips3" => Ok(Mode::Mips3),
            "mips32r6" => Ok(Mode::Mips32R6),
            "16" | "16-bit" | "mode16" => Ok(Mode::Mode16),
            "32" | "32-bit" | "mode32" => Ok(Mode::Mode32),
            "64" | "64-bit" | "mode64" => Ok(Mode::Mode64),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

/// Byte order of the code buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Operand text syntax. Only x86 offers a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    #[default]
    Intel,
    Att,
}

/// Everything needed to open an [`Engine`](crate::decoder::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub arch: Architecture,
    pub mode: Mode,
    #[serde(default)]
    pub endian: Endian,
    /// ARM Cortex-M profile
    #[serde(default)]
    pub mclass: bool,
    /// ARMv8 A32 encodings
    #[serde(default)]
    pub v8: bool,
    /// microMIPS
    #[serde(default)]
    pub micro: bool,
    #[serde(default)]
    pub syntax: Syntax,
}

impl EngineConfig {
    /// Little-endian config with no extras.
    pub fn new(arch: Architecture, mode: Mode) -> Self {
        Self {
            arch,
            mode,
            endian: Endian::Little,
            mclass: false,
            v8: false,
            micro: false,
            syntax: Syntax::Intel,
        }
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn mclass(mut self, enable: bool) -> Self {
        self.mclass = enable;
        self
    }

    pub fn v8(mut self, enable: bool) -> Self {
        self.v8 = enable;
        self
    }

    pub fn micro(mut self, enable: bool) -> Self {
        self.micro = enable;
        self
    }

    pub fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Parse a JSON config such as `{"arch": "arm", "mode": "thumb", "mclass": true}`.
    pub fn from_json(text: &str) -> Result<Self, DisassemblyError> {
        serde_json::from_str(text)
            .map_err(|e| DisassemblyError::InitializationError(format!("Invalid config: {}", e)))
    }

    /// Check the config against the support table without opening anything.
    pub fn validate(&self) -> Result<(), DisassemblyError> {
        let arch = self.arch;
        if !self.mode.is_supported_by(arch) {
            return Err(DisassemblyError::UnsupportedMode { arch, mode: self.mode });
        }
        if self.endian == Endian::Big && arch == Architecture::X86 {
            return Err(DisassemblyError::UnsupportedOption { arch, option: "big-endian" });
        }
        if (self.mclass || self.v8) && arch != Architecture::Arm {
            let option = if self.mclass { "mclass" } else { "v8" };
            return Err(DisassemblyError::UnsupportedOption { arch, option });
        }
        if self.micro && arch != Architecture::Mips {
            return Err(DisassemblyError::UnsupportedOption { arch, option: "micro" });
        }
        if self.syntax != Syntax::Intel && arch != Architecture::X86 {
            return Err(DisassemblyError::UnsupportedOption { arch, option: "syntax" });
        }
        Ok(())
    }

    pub(crate) fn extra_modes(&self) -> Vec<capstone::ExtraMode> {
        let mut extra = Vec::new();
        if self.mclass {
            extra.push(capstone::ExtraMode::MClass);
        }
        if self.v8 {
            extra.push(capstone::ExtraMode::V8);
        }
        if self.micro {
            extra.push(capstone::ExtraMode::Micro);
        }
        extra
    }

    pub(crate) fn capstone_endian(&self) -> Option<capstone::Endian> {
        match (self.arch, self.endian) {
            (Architecture::X86, _) => None,
            (_, Endian::Little) => Some(capstone::Endian::Little),
            (_, Endian::Big) => Some(capstone::Endian::Big),
        }
    }
}

impl From<(Architecture, Mode)> for EngineConfig {
    fn from((arch, mode): (Architecture, Mode)) -> Self {
        EngineConfig::new(arch, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_table() {
        assert!(Mode::Thumb.is_supported_by(Architecture::Arm));
        assert!(Mode::Arm.is_supported_by(Architecture::Arm64));
        assert!(!Mode::Thumb.is_supported_by(Architecture::Arm64));
        assert!(!Mode::Arm.is_supported_by(Architecture::X86));
        assert!(!Mode::Mode64.is_supported_by(Architecture::Mips));
        assert!(Mode::Mips32R6.is_supported_by(Architecture::Mips));
    }

    #[test]
    fn test_supported_pairs() {
        let pairs = Mode::supported_pairs();
        assert_eq!(pairs.len(), 11);
        assert!(pairs.contains(&(Architecture::X86, Mode::Mode16)));
        assert!(pairs.iter().all(|(arch, mode)| mode.is_supported_by(*arch)));
    }

    #[test]
    fn test_mode_round_trips_through_display() {
        for (_, mode) in Mode::supported_pairs() {
            assert_eq!(mode.to_string().parse::<Mode>(), Ok(mode));
        }
    }

    #[test]
    fn test_validate_rejects_foreign_options() {
        let err = EngineConfig::new(Architecture::X86, Mode::Mode32)
            .endian(Endian::Big)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            DisassemblyError::UnsupportedOption {
                arch: Architecture::X86,
                option: "big-endian"
            }
        );

        let err = EngineConfig::new(Architecture::Mips, Mode::Mips32)
            .mclass(true)
            .validate()
            .unwrap_err();
        assert!(err.is_initialization());

        let err = EngineConfig::new(Architecture::Arm, Mode::Arm)
            .syntax(Syntax::Att)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DisassemblyError::UnsupportedOption { option: "syntax", .. }));
    }

    #[test]
    fn test_validate_accepts_arch_options() {
        EngineConfig::new(Architecture::Arm, Mode::Thumb)
            .mclass(true)
            .endian(Endian::Big)
            .validate()
            .unwrap();
        EngineConfig::new(Architecture::X86, Mode::Mode64)
            .syntax(Syntax::Att)
            .validate()
            .unwrap();
        EngineConfig::new(Architecture::Mips, Mode::Mips32)
            .micro(true)
            .validate()
            .unwrap();
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json(r#"{"arch": "arm", "mode": "thumb", "mclass": true}"#)
            .unwrap();
        assert_eq!(config.arch, Architecture::Arm);
        assert_eq!(config.mode, Mode::Thumb);
        assert!(config.mclass);
        assert_eq!(config.endian, Endian::Little);
        assert_eq!(config.syntax, Syntax::Intel);

        assert!(EngineConfig::from_json(r#"{"arch": "sparc", "mode": "arm"}"#).is_err());
    }
}
