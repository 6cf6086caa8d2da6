//! Stack-machine instruction set.
//!
//! A fixed vocabulary of operations over a small integer stack, used both to
//! express the known interpolation formulas and as the genome representation
//! for the genetic search. Each gene packs into a single `u64` word so the
//! lock-free shared best slots can exchange chromosomes one atomic word at a
//! time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single stack-machine instruction.
///
/// The constant push carries its payload; every other variant is a named
/// operator. The two cases never coexist, hence the tagged enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Push a literal constant.
    PushConst(i32),
    /// Push the context X coordinate.
    PushX,
    /// Push the context Y coordinate.
    PushY,
    /// Push the slope width.
    PushWidth,
    /// Push the slope height.
    PushHeight,
    /// Push 1 for left edges, 0 for right edges.
    PushLeft,
    Add,
    Sub,
    Mul,
    /// Division; divisor 0 and `i32::MIN / -1` yield `i32::MAX`.
    Div,
    /// Modulo; divisor 0 and `i32::MIN % -1` yield 0.
    Mod,
    Neg,
    And,
    Or,
    Xor,
    Not,
    /// Left shift; count masked to 0..=31.
    Shl,
    /// Arithmetic (sign-preserving) right shift; count masked to 0..=31.
    Sar,
    /// Logical right shift; count masked to 0..=31.
    Shr,
    /// Duplicate the top of the stack.
    Dup,
    /// Swap the two topmost values.
    Swap,
    /// Keep only the fractional slope bits (`v & MASK`).
    Frac,
    /// Drop the fractional slope bits (`v >> 18`).
    Trunc,
    /// Promote an integer to slope fixed-point (`v << 18`, wrapping).
    ToFrac,
    /// Truncated fixed-point reciprocal (`ONE / v`); 0 yields `i32::MAX`.
    Recip,
    /// Scale into coverage space (`v << 5`).
    ExpandAa,
    /// Scale out of coverage space (`v >> 5`).
    ShrinkAa,
    /// Push one slope fixed-point unit.
    PushOne,
    /// Push the half-pixel slope bias.
    PushBias,
    /// Push the coverage range (32).
    PushAaRange,
    /// Multiply by the truncated reciprocal of the context height
    /// (`v * (ONE / height)`), the hardware's overflow-avoidance composite.
    MulHeightRecip,
}

/// Every operator variant, in packed-opcode order. `PushConst` is index 0.
pub const OP_COUNT: u8 = 31;

const OPS: [Op; OP_COUNT as usize] = [
    Op::PushConst(0),
    Op::PushX,
    Op::PushY,
    Op::PushWidth,
    Op::PushHeight,
    Op::PushLeft,
    Op::Add,
    Op::Sub,
    Op::Mul,
    Op::Div,
    Op::Mod,
    Op::Neg,
    Op::And,
    Op::Or,
    Op::Xor,
    Op::Not,
    Op::Shl,
    Op::Sar,
    Op::Shr,
    Op::Dup,
    Op::Swap,
    Op::Frac,
    Op::Trunc,
    Op::ToFrac,
    Op::Recip,
    Op::ExpandAa,
    Op::ShrinkAa,
    Op::PushOne,
    Op::PushBias,
    Op::PushAaRange,
    Op::MulHeightRecip,
];

impl Op {
    /// Opcode used by the packed gene encoding.
    pub fn opcode(&self) -> u8 {
        match self {
            Op::PushConst(_) => 0,
            Op::PushX => 1,
            Op::PushY => 2,
            Op::PushWidth => 3,
            Op::PushHeight => 4,
            Op::PushLeft => 5,
            Op::Add => 6,
            Op::Sub => 7,
            Op::Mul => 8,
            Op::Div => 9,
            Op::Mod => 10,
            Op::Neg => 11,
            Op::And => 12,
            Op::Or => 13,
            Op::Xor => 14,
            Op::Not => 15,
            Op::Shl => 16,
            Op::Sar => 17,
            Op::Shr => 18,
            Op::Dup => 19,
            Op::Swap => 20,
            Op::Frac => 21,
            Op::Trunc => 22,
            Op::ToFrac => 23,
            Op::Recip => 24,
            Op::ExpandAa => 25,
            Op::ShrinkAa => 26,
            Op::PushOne => 27,
            Op::PushBias => 28,
            Op::PushAaRange => 29,
            Op::MulHeightRecip => 30,
        }
    }

    /// Decode an opcode and constant payload. Unknown opcodes fall back to the
    /// constant push so every packed word decodes to something executable.
    pub fn from_opcode(opcode: u8, payload: i32) -> Self {
        match OPS.get(opcode as usize) {
            Some(Op::PushConst(_)) | None => Op::PushConst(payload),
            Some(&op) => op,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::PushConst(v) => write!(f, "push {}", v),
            Op::PushX => write!(f, "push x"),
            Op::PushY => write!(f, "push y"),
            Op::PushWidth => write!(f, "push width"),
            Op::PushHeight => write!(f, "push height"),
            Op::PushLeft => write!(f, "push left"),
            Op::Add => write!(f, "add"),
            Op::Sub => write!(f, "sub"),
            Op::Mul => write!(f, "mul"),
            Op::Div => write!(f, "div"),
            Op::Mod => write!(f, "mod"),
            Op::Neg => write!(f, "neg"),
            Op::And => write!(f, "and"),
            Op::Or => write!(f, "or"),
            Op::Xor => write!(f, "xor"),
            Op::Not => write!(f, "not"),
            Op::Shl => write!(f, "shl"),
            Op::Sar => write!(f, "sar"),
            Op::Shr => write!(f, "shr"),
            Op::Dup => write!(f, "dup"),
            Op::Swap => write!(f, "swap"),
            Op::Frac => write!(f, "frac"),
            Op::Trunc => write!(f, "trunc"),
            Op::ToFrac => write!(f, "to_frac"),
            Op::Recip => write!(f, "recip"),
            Op::ExpandAa => write!(f, "expand_aa"),
            Op::ShrinkAa => write!(f, "shrink_aa"),
            Op::PushOne => write!(f, "push one"),
            Op::PushBias => write!(f, "push bias"),
            Op::PushAaRange => write!(f, "push aa_range"),
            Op::MulHeightRecip => write!(f, "mul_height_recip"),
        }
    }
}

/// An instruction plus an enabled flag.
///
/// Disabled genes are skipped during execution, which lets a fixed-size
/// chromosome express variable-effective-length programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub op: Op,
    pub enabled: bool,
}

/// Bit layout of the packed gene word.
const PAYLOAD_SHIFT: u32 = 0;
const OPCODE_SHIFT: u32 = 32;
const ENABLED_SHIFT: u32 = 40;

impl Gene {
    pub fn new(op: Op, enabled: bool) -> Self {
        Self { op, enabled }
    }

    /// Pack into one `u64` word: payload in bits 0..32, opcode in bits 32..40,
    /// enabled flag in bit 40.
    pub fn pack(&self) -> u64 {
        let payload = match self.op {
            Op::PushConst(v) => v as u32,
            _ => 0,
        };
        (payload as u64) << PAYLOAD_SHIFT
            | (self.op.opcode() as u64) << OPCODE_SHIFT
            | (self.enabled as u64) << ENABLED_SHIFT
    }

    /// Unpack from a `u64` word. Total: any word decodes to a valid gene, so a
    /// torn mix of words from two different chromosomes is still executable.
    pub fn unpack(word: u64) -> Self {
        let payload = (word >> PAYLOAD_SHIFT) as u32 as i32;
        let opcode = (word >> OPCODE_SHIFT) as u8;
        let enabled = (word >> ENABLED_SHIFT) & 1 != 0;
        Self {
            op: Op::from_opcode(opcode, payload),
            enabled,
        }
    }
}

/// Render an instruction sequence for reporting, one enabled gene per line.
pub fn disassemble(genes: &[Gene]) -> String {
    let mut out = String::new();
    for gene in genes.iter().filter(|g| g.enabled) {
        out.push_str(&gene.op.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for opcode in 0..OP_COUNT {
            let op = Op::from_opcode(opcode, 7);
            assert_eq!(op.opcode(), opcode);
        }
    }

    #[test]
    fn test_gene_pack_round_trip() {
        let genes = [
            Gene::new(Op::PushConst(-123456), true),
            Gene::new(Op::PushConst(i32::MAX), false),
            Gene::new(Op::MulHeightRecip, true),
            Gene::new(Op::Swap, false),
        ];
        for gene in genes {
            assert_eq!(Gene::unpack(gene.pack()), gene);
        }
    }

    #[test]
    fn test_unknown_opcode_decodes_to_constant() {
        let word = (200u64) << 32 | 42;
        let gene = Gene::unpack(word);
        assert_eq!(gene.op, Op::PushConst(42));
    }

    #[test]
    fn test_disassemble() {
        let genes = [
            Gene::new(Op::PushX, true),
            Gene::new(Op::PushConst(5), true),
            Gene::new(Op::Add, false),
            Gene::new(Op::Mul, true),
        ];
        assert_eq!(disassemble(&genes), "push x\npush 5\nmul\n");
    }
}
