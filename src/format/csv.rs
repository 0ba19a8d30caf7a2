//! CSV output formatter

use serde::Serialize;

use super::{hex_bytes, ListingFormatter};
use crate::{Disassembly, DisassemblyError, Instruction};

/// One CSV row. `kind` is `insn` for decoded instructions and `stop` for the
/// trailing row written when decoding stopped on undecodable bytes.
#[derive(Serialize)]
struct Row<'a> {
    kind: &'static str,
    address: String,
    size: Option<u16>,
    bytes: String,
    mnemonic: &'a str,
    operands: &'a str,
    groups: String,
}

impl<'a> Row<'a> {
    fn from_insn(insn: &'a Instruction) -> Self {
        Row {
            kind: "insn",
            address: format!("0x{:x}", insn.address()),
            size: Some(insn.size()),
            bytes: hex_bytes(insn),
            mnemonic: insn.mnemonic(),
            operands: insn.op_str(),
            groups: insn
                .groups()
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn csv_error<E: std::fmt::Display>(err: E) -> DisassemblyError {
    DisassemblyError::FormatError(format!("CSV serialization error: {}", err))
}

impl ListingFormatter for super::CsvFormatter {
    fn format(&self, disassembly: &Disassembly) -> Result<String, DisassemblyError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        for insn in disassembly {
            writer.serialize(Row::from_insn(insn)).map_err(csv_error)?;
        }

        if let Some(err) = &disassembly.error {
            writer
                .serialize(Row {
                    kind: "stop",
                    address: format!("0x{:x}", err.address),
                    size: None,
                    bytes: String::new(),
                    mnemonic: "",
                    operands: "",
                    groups: String::new(),
                })
                .map_err(csv_error)?;
        }

        let data = writer.into_inner().map_err(csv_error)?;
        String::from_utf8(data).map_err(csv_error)
    }
}
