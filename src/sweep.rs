//! Linear sweep: the decode loop shared by every architecture.

use crate::{Address, DecodeError, Decoder, Disassembly};

/// Linear sweep over `code`, stopping at the first undecodable unit.
///
/// # Arguments
/// * `decoder` - Single-step decoder for the target architecture
/// * `code` - The machine code to disassemble
/// * `base` - Virtual address of `code[0]`
/// * `count` - Maximum number of instructions, `0` for no limit
///
/// # Returns
/// Every instruction decoded before the sweep stopped. When it stopped on
/// bytes that do not form an instruction (invalid or truncated), `error`
/// records how far it got; no attempt is made to resync.
pub fn run(decoder: &dyn Decoder, code: &[u8], base: Address, count: usize) -> Disassembly {
    log::debug!(
        "Starting {} sweep of {} bytes at 0x{:x} (limit {})",
        decoder.architecture(),
        code.len(),
        base,
        count
    );

    let mut instructions = Vec::new();
    let mut error = None;
    let mut cursor = 0usize;

    while cursor < code.len() && (count == 0 || instructions.len() < count) {
        let remaining = &code[cursor..];
        let address = base.wrapping_add(cursor as Address);

        let size = match decoder.decode(remaining, address) {
            Some(insn) => {
                let size = insn.size() as usize;
                // A zero-length or overlong unit would stall or overrun the cursor
                if size == 0 || size > remaining.len() {
                    None
                } else {
                    instructions.push(insn);
                    Some(size)
                }
            }
            None => None,
        };

        match size {
            Some(size) => cursor += size,
            None => {
                log::trace!("Undecodable bytes at 0x{:x} (offset {})", address, cursor);
                error = Some(DecodeError {
                    instructions: instructions.len(),
                    bytes_consumed: cursor,
                    address,
                });
                break;
            }
        }
    }

    log::debug!(
        "Sweep complete: {} instructions, {} of {} bytes{}",
        instructions.len(),
        cursor,
        code.len(),
        if error.is_some() { ", stopped on invalid bytes" } else { "" }
    );

    Disassembly { instructions, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::{DetailRecord, MipsDetail};
    use crate::insn::{Instruction, InstructionHeader};
    use crate::Architecture;

    /// Toy encoding: the first byte is the instruction length, `0` is invalid.
    struct LengthPrefixed;

    impl Decoder for LengthPrefixed {
        fn architecture(&self) -> Architecture {
            Architecture::Mips
        }

        fn decode(&self, code: &[u8], address: Address) -> Option<Instruction> {
            let len = *code.first()? as usize;
            if len == 0 || len > code.len() {
                return None;
            }
            Some(Instruction {
                header: InstructionHeader {
                    address,
                    size: len as u16,
                    bytes: code[..len].to_vec(),
                    mnemonic: format!("op{}", len),
                    ..InstructionHeader::default()
                },
                detail: DetailRecord::Mips(MipsDetail::default()),
            })
        }
    }

    /// Claims a fixed size regardless of the input.
    struct Lying(u16);

    impl Decoder for Lying {
        fn architecture(&self) -> Architecture {
            Architecture::X86
        }

        fn decode(&self, _code: &[u8], address: Address) -> Option<Instruction> {
            Some(Instruction {
                header: InstructionHeader {
                    address,
                    size: self.0,
                    ..InstructionHeader::default()
                },
                detail: DetailRecord::Mips(MipsDetail::default()),
            })
        }
    }

    #[test]
    fn test_empty_buffer() {
        for count in [0, 1, 100] {
            let result = run(&LengthPrefixed, &[], 0x400, count);
            assert!(result.instructions.is_empty());
            assert!(result.error.is_none());
        }
    }

    #[test]
    fn test_addresses_follow_sizes() {
        let code = [1, 3, 0xaa, 0xbb, 2, 0xcc];
        let result = run(&LengthPrefixed, &code, 0x1000, 0);

        let addrs: Vec<_> = result.iter().map(|i| i.address()).collect();
        assert_eq!(addrs, vec![0x1000, 0x1001, 0x1004]);
        assert_eq!(result.bytes_consumed(), code.len());
        assert!(result.is_complete());
    }

    #[test]
    fn test_count_limit_is_a_prefix() {
        let code = [1, 1, 2, 0xff, 1, 1];
        let all = run(&LengthPrefixed, &code, 0, 0);
        assert_eq!(all.instruction_count(), 5);

        for m in 1..5 {
            let limited = run(&LengthPrefixed, &code, 0, m);
            assert_eq!(limited.instructions, all.instructions[..m].to_vec());
            assert!(limited.error.is_none());
        }
    }

    #[test]
    fn test_stops_at_invalid_bytes() {
        let code = [2, 0x10, 1, 0, 1, 1];
        let result = run(&LengthPrefixed, &code, 0x2000, 0);

        assert_eq!(result.instruction_count(), 2);
        assert_eq!(
            result.error,
            Some(DecodeError {
                instructions: 2,
                bytes_consumed: 3,
                address: 0x2003,
            })
        );
    }

    #[test]
    fn test_truncated_tail() {
        // Last instruction claims four bytes but only two remain
        let code = [1, 4, 0xaa];
        let result = run(&LengthPrefixed, &code, 0, 0);
        assert_eq!(result.instruction_count(), 1);
        assert_eq!(result.error.map(|e| e.bytes_consumed), Some(1));
    }

    #[test]
    fn test_failure_before_first_instruction() {
        let result = run(&LengthPrefixed, &[0, 1, 1], 0x10, 0);
        assert!(result.instructions.is_empty());
        assert_eq!(
            result.error,
            Some(DecodeError {
                instructions: 0,
                bytes_consumed: 0,
                address: 0x10,
            })
        );
    }

    #[test]
    fn test_rejects_zero_and_overlong_sizes() {
        let result = run(&Lying(0), &[0x90; 4], 0, 0);
        assert!(result.instructions.is_empty());
        assert!(result.error.is_some());

        let result = run(&Lying(8), &[0x90; 4], 0, 0);
        assert!(result.instructions.is_empty());
        assert_eq!(result.error.map(|e| e.bytes_consumed), Some(0));
    }

    #[test]
    fn test_limit_reached_with_bytes_left_is_not_an_error() {
        let code = [1, 1, 0];
        let result = run(&LengthPrefixed, &code, 0, 2);
        assert_eq!(result.instruction_count(), 2);
        assert!(result.is_complete());
    }
}
