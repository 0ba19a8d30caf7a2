//! Listing formatters for decode results

mod csv;
mod json;

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{Disassembly, DisassemblyError, Instruction};

/// Supported listing formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text listing (default)
    #[default]
    Text,
    /// JSON document holding the whole result
    Json,
    /// JSON Lines, one instruction per line
    JsonLines,
    /// CSV, one instruction per row
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    pub fn available_formats() -> &'static [Self] {
        &[
            OutputFormat::Text,
            OutputFormat::Json,
            OutputFormat::JsonLines,
            OutputFormat::Csv,
        ]
    }

    /// Get a formatter for this output format
    pub fn formatter(&self) -> Box<dyn ListingFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::JsonLines => Box::new(JsonLinesFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
        }
    }

    /// Render `disassembly` in this format
    pub fn render(&self, disassembly: &Disassembly) -> Result<String, DisassemblyError> {
        self.formatter().format(disassembly)
    }
}

/// Renders a decode result as text
pub trait ListingFormatter {
    fn format(&self, disassembly: &Disassembly) -> Result<String, DisassemblyError>;
}

/// Plain text listing
pub struct TextFormatter;

/// JSON document
pub struct JsonFormatter;

/// JSON Lines
pub struct JsonLinesFormatter;

/// CSV rows
pub struct CsvFormatter;

/// Lower-case hex bytes separated by spaces
pub(crate) fn hex_bytes(insn: &Instruction) -> String {
    insn.bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

impl ListingFormatter for TextFormatter {
    fn format(&self, disassembly: &Disassembly) -> Result<String, DisassemblyError> {
        let mut output = String::new();

        for insn in disassembly {
            output.push_str(&format!(
                "0x{:08x}: {:<10} {:<30} ; {}\n",
                insn.address(),
                insn.mnemonic(),
                insn.op_str(),
                hex_bytes(insn)
            ));
        }

        if let Some(err) = &disassembly.error {
            output.push_str(&format!("; {}\n", err));
        }

        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detail::{DetailRecord, X86Detail};
    use crate::insn::InstructionHeader;
    use crate::DecodeError;

    pub(crate) fn sample_listing() -> Disassembly {
        let insn = |address, bytes: &[u8], mnemonic: &str, op_str: &str| Instruction {
            header: InstructionHeader {
                address,
                size: bytes.len() as u16,
                bytes: bytes.to_vec(),
                mnemonic: mnemonic.to_string(),
                op_str: op_str.to_string(),
                ..InstructionHeader::default()
            },
            detail: DetailRecord::X86(X86Detail::default()),
        };

        Disassembly {
            instructions: vec![
                insn(0x1000, &[0x55], "push", "rbp"),
                insn(0x1001, &[0x48, 0x89, 0xe5], "mov", "rbp, rsp"),
                insn(0x1004, &[0xc3], "ret", ""),
            ],
            error: Some(DecodeError {
                instructions: 3,
                bytes_consumed: 5,
                address: 0x1005,
            }),
        }
    }

    #[test]
    fn test_text_listing() {
        let result = TextFormatter.format(&sample_listing()).unwrap();
        let lines: Vec<_> = result.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("0x00001000: push"));
        assert!(lines[1].starts_with("0x00001001: mov"));
        assert!(lines[1].ends_with("; 48 89 e5"));
        assert!(lines[2].starts_with("0x00001004: ret"));
        assert_eq!(
            lines[3],
            "; Invalid instruction at 0x1005 after 3 instructions (5 bytes)"
        );
    }

    #[test]
    fn test_text_listing_complete() {
        let mut disasm = sample_listing();
        disasm.error = None;
        let result = OutputFormat::Text.render(&disasm).unwrap();
        assert_eq!(result.lines().count(), 3);
        assert!(OutputFormat::Text.render(&Disassembly::default()).unwrap().is_empty());
    }

    #[test]
    fn test_format_names() {
        for format in OutputFormat::available_formats() {
            assert_eq!(format.to_string().parse::<OutputFormat>(), Ok(*format));
        }
        assert_eq!("JSONLines".parse::<OutputFormat>(), Ok(OutputFormat::JsonLines));
        assert!("ngram".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}
