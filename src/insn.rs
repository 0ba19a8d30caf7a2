//! Generic instruction header and the per-instruction record.

use std::fmt;

use serde::Serialize;

use crate::detail::{DetailRecord, RegId};
use crate::{Address, Architecture};

/// Instruction id within its architecture's id space.
pub type InsnId = u32;

/// Group-membership id.
pub type GroupId = u32;

/// Terminator of the raw register and group id arrays.
pub const SENTINEL: u32 = 0;

/// Architecture-independent group ids.
pub mod group {
    use super::GroupId;

    pub const JUMP: GroupId = 1;
    pub const CALL: GroupId = 2;
    pub const RET: GroupId = 3;
    pub const INT: GroupId = 4;
    pub const IRET: GroupId = 5;
    pub const PRIVILEGE: GroupId = 6;
    pub const BRANCH_RELATIVE: GroupId = 7;
}

/// Copy ids out of a raw array, stopping at the first [`SENTINEL`].
///
/// The scan is bounded by the input length even when no sentinel is present.
pub fn until_sentinel<I>(raw: I) -> Vec<u32>
where
    I: IntoIterator,
    I::Item: Into<u32>,
{
    raw.into_iter()
        .map(Into::into)
        .take_while(|id| *id != SENTINEL)
        .collect()
}

/// Fields common to every decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InstructionHeader {
    pub id: InsnId,
    /// Virtual address, base-relative
    pub address: Address,
    /// Size of the instruction in bytes
    pub size: u16,
    /// Raw encoding
    pub bytes: Vec<u8>,
    /// Instruction mnemonic (e.g., "mov", "add")
    pub mnemonic: String,
    /// Operands as text
    pub op_str: String,
    /// Registers read implicitly
    pub regs_read: Vec<RegId>,
    /// Registers written implicitly
    pub regs_write: Vec<RegId>,
    pub groups: Vec<GroupId>,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    #[serde(flatten)]
    pub header: InstructionHeader,
    pub detail: DetailRecord,
}

impl Instruction {
    pub fn id(&self) -> InsnId {
        self.header.id
    }

    pub fn address(&self) -> Address {
        self.header.address
    }

    pub fn size(&self) -> u16 {
        self.header.size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.header.bytes
    }

    pub fn mnemonic(&self) -> &str {
        &self.header.mnemonic
    }

    pub fn op_str(&self) -> &str {
        &self.header.op_str
    }

    pub fn regs_read(&self) -> &[RegId] {
        &self.header.regs_read
    }

    pub fn regs_write(&self) -> &[RegId] {
        &self.header.regs_write
    }

    pub fn groups(&self) -> &[GroupId] {
        &self.header.groups
    }

    pub fn architecture(&self) -> Architecture {
        self.detail.architecture()
    }

    /// Address of the following instruction
    pub fn end_address(&self) -> Address {
        self.header.address.wrapping_add(self.header.size as Address)
    }

    pub fn in_group(&self, group: GroupId) -> bool {
        self.header.groups.contains(&group)
    }

    pub fn is_jump(&self) -> bool {
        self.in_group(group::JUMP)
    }

    pub fn is_call(&self) -> bool {
        self.in_group(group::CALL)
    }

    pub fn is_return(&self) -> bool {
        self.in_group(group::RET) || self.in_group(group::IRET)
    }

    pub fn operand_count(&self) -> usize {
        self.detail.operand_count()
    }

    /// Number of operands as they appear in the operand text
    pub fn operand_tokens(&self) -> usize {
        operand_tokens(self.architecture(), &self.header.op_str)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.header.op_str.is_empty() {
            write!(f, "{}", self.header.mnemonic)
        } else {
            write!(f, "{}\t{}", self.header.mnemonic, self.header.op_str)
        }
    }
}

/// Shift and extend keywords that qualify the preceding operand
/// (`r2, lsl #2`, `w1, uxtw #2`) rather than forming one of their own.
const OPERAND_QUALIFIERS: [&str; 14] = [
    "lsl", "lsr", "asr", "ror", "rrx", "msl", "uxtb", "uxth", "uxtw", "uxtx", "sxtb", "sxth",
    "sxtw", "sxtx",
];

/// ARM and AArch64 condition suffixes printed as a trailing word
/// (`csel x0, x1, x2, eq`). They are recorded as the instruction's condition,
/// not as an operand.
const CONDITION_WORDS: [&str; 18] = [
    "eq", "ne", "hs", "cs", "lo", "cc", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt",
    "le", "al", "nv",
];

/// Counts the operands in an operand string.
///
/// Commas inside `[...]` and `(...)` belong to one memory operand; commas
/// inside `{...}` separate list elements, each of which is an operand. An x86
/// opmask decorator (`{k1}`) is an operand of its own, while `{z}`, `{sae}`,
/// rounding and broadcast decorators are not.
pub fn operand_tokens(arch: Architecture, op_str: &str) -> usize {
    let fold_condition = matches!(arch, Architecture::Arm | Architecture::Arm64);
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in op_str.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&op_str[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(&op_str[start..]);

    let last = tokens.len() - 1;
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| token_weight(token, fold_condition && i == last))
        .sum()
}

fn token_weight(token: &str, may_be_condition: bool) -> usize {
    let (rest, opmasks) = strip_decorators(token);
    let rest = rest
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    if rest.is_empty() {
        return opmasks;
    }

    let word = rest
        .split(|c: char| c.is_whitespace() || c == '#')
        .next()
        .unwrap_or("");
    let is_condition = may_be_condition && CONDITION_WORDS.contains(&rest);
    if OPERAND_QUALIFIERS.contains(&word) || is_condition {
        opmasks
    } else {
        opmasks + 1
    }
}

/// Removes complete `{...}` decorator groups from `token`, returning what is
/// left and the number of opmask registers among them.
fn strip_decorators(token: &str) -> (String, usize) {
    let mut rest = String::with_capacity(token.len());
    let mut opmasks = 0;
    let mut remaining = token;

    while let Some(open) = remaining.find('{') {
        let Some(len) = remaining[open..].find('}') else {
            break;
        };
        let inner = remaining[open + 1..open + len].trim().trim_start_matches('%');

        rest.push_str(&remaining[..open]);
        if is_opmask(inner) {
            opmasks += 1;
        } else if !is_decorator(inner) {
            rest.push_str(&remaining[open..=open + len]);
        }
        remaining = &remaining[open + len + 1..];
    }
    rest.push_str(remaining);

    (rest, opmasks)
}

fn is_opmask(inner: &str) -> bool {
    inner
        .strip_prefix('k')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn is_decorator(inner: &str) -> bool {
    inner == "z" || inner == "sae" || inner.ends_with("-sae") || inner.starts_with("1to")
}
