//! JSON and JSON Lines output formatters

use serde::Serialize;

use super::ListingFormatter;
use crate::{DecodeError, Disassembly, DisassemblyError};

/// Line emitted after the instructions when decoding stopped early
#[derive(Serialize)]
struct StopLine<'a> {
    stop: &'a DecodeError,
}

fn json_error(err: serde_json::Error) -> DisassemblyError {
    DisassemblyError::FormatError(format!("JSON serialization error: {}", err))
}

impl ListingFormatter for super::JsonFormatter {
    fn format(&self, disassembly: &Disassembly) -> Result<String, DisassemblyError> {
        serde_json::to_string_pretty(disassembly).map_err(json_error)
    }
}

impl ListingFormatter for super::JsonLinesFormatter {
    fn format(&self, disassembly: &Disassembly) -> Result<String, DisassemblyError> {
        let mut output = String::new();

        for insn in disassembly {
            output.push_str(&serde_json::to_string(insn).map_err(json_error)?);
            output.push('\n');
        }

        if let Some(stop) = &disassembly.error {
            output.push_str(&serde_json::to_string(&StopLine { stop }).map_err(json_error)?);
            output.push('\n');
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::format::tests::sample_listing;
    use crate::format::{JsonFormatter, JsonLinesFormatter};

    #[test]
    fn test_json_document() {
        let result = JsonFormatter.format(&sample_listing()).unwrap();
        let value: Value = serde_json::from_str(&result).unwrap();

        let insns = value["instructions"].as_array().unwrap();
        assert_eq!(insns.len(), 3);
        assert_eq!(insns[0]["mnemonic"], "push");
        assert_eq!(insns[1]["address"], 0x1001);
        assert_eq!(insns[1]["bytes"], serde_json::json!([0x48, 0x89, 0xe5]));
        assert_eq!(insns[2]["detail"]["arch"], "x86");
        assert_eq!(value["error"]["bytes_consumed"], 5);
    }

    #[test]
    fn test_json_lines() {
        let result = JsonLinesFormatter.format(&sample_listing()).unwrap();
        let lines: Vec<Value> = result
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["op_str"], "rbp");
        assert_eq!(lines[2]["mnemonic"], "ret");
        assert_eq!(lines[3]["stop"]["address"], 0x1005);
    }

    #[test]
    fn test_json_lines_complete() {
        let mut disasm = sample_listing();
        disasm.error = None;
        let result = JsonLinesFormatter.format(&disasm).unwrap();
        assert_eq!(result.lines().count(), 3);
        assert!(!result.contains("stop"));
    }
}
