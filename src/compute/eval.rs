//! Stack-machine evaluator.
//!
//! Executes instruction sequences against a small variable context. Malformed
//! programs (stack underflow, wrong final stack depth) are an expected outcome
//! during search and surface as `false`/`None`, never as a panic. Arithmetic
//! edge cases resolve to defined sentinels.

use super::ops::{Gene, Op};
use super::slope::{AA_BITS, BIAS, FRAC_BITS, MASK, ONE, Slope};

/// Mutable evaluation context: the value stack plus the four named variables
/// and the optional left-edge orientation.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub left: bool,
    stack: Vec<i32>,
}

impl EvalContext {
    pub fn new(x: i32, y: i32, width: i32, height: i32, left: bool) -> Self {
        Self {
            x,
            y,
            width,
            height,
            left,
            stack: Vec::with_capacity(16),
        }
    }

    /// Execute a single operation. Returns `false` without further mutation if
    /// the stack holds fewer values than the operation needs.
    pub fn execute(&mut self, op: Op) -> bool {
        match op {
            Op::PushConst(v) => self.stack.push(v),
            Op::PushX => self.stack.push(self.x),
            Op::PushY => self.stack.push(self.y),
            Op::PushWidth => self.stack.push(self.width),
            Op::PushHeight => self.stack.push(self.height),
            Op::PushLeft => self.stack.push(self.left as i32),
            Op::PushOne => self.stack.push(ONE),
            Op::PushBias => self.stack.push(BIAS),
            Op::PushAaRange => self.stack.push(1 << AA_BITS),

            Op::Add => return self.binary(|a, b| a.wrapping_add(b)),
            Op::Sub => return self.binary(|a, b| a.wrapping_sub(b)),
            Op::Mul => return self.binary(|a, b| a.wrapping_mul(b)),
            Op::Div => return self.binary(checked_div),
            Op::Mod => return self.binary(checked_mod),
            Op::And => return self.binary(|a, b| a & b),
            Op::Or => return self.binary(|a, b| a | b),
            Op::Xor => return self.binary(|a, b| a ^ b),
            Op::Shl => return self.binary(|a, b| a.wrapping_shl(b as u32 & 31)),
            Op::Sar => return self.binary(|a, b| a.wrapping_shr(b as u32 & 31)),
            Op::Shr => return self.binary(|a, b| ((a as u32) >> (b as u32 & 31)) as i32),

            Op::Neg => return self.unary(i32::wrapping_neg),
            Op::Not => return self.unary(|v| !v),
            Op::Frac => return self.unary(|v| v & MASK),
            Op::Trunc => return self.unary(|v| v >> FRAC_BITS),
            Op::ToFrac => return self.unary(|v| v.wrapping_shl(FRAC_BITS)),
            Op::Recip => return self.unary(|v| checked_div(ONE, v)),
            Op::ExpandAa => return self.unary(|v| v.wrapping_shl(AA_BITS)),
            Op::ShrinkAa => return self.unary(|v| v >> AA_BITS),

            Op::MulHeightRecip => {
                let recip = checked_div(ONE, self.height);
                return self.unary(|v| v.wrapping_mul(recip));
            }

            Op::Dup => {
                let Some(&top) = self.stack.last() else {
                    return false;
                };
                self.stack.push(top);
            }
            Op::Swap => {
                let len = self.stack.len();
                if len < 2 {
                    return false;
                }
                self.stack.swap(len - 1, len - 2);
            }
        }
        true
    }

    /// Run a full sequence, skipping disabled genes. Succeeds only if exactly
    /// one value remains on the stack; that value is the result.
    pub fn eval(&mut self, genes: &[Gene]) -> Option<i32> {
        self.stack.clear();
        for gene in genes.iter().filter(|g| g.enabled) {
            if !self.execute(gene.op) {
                return None;
            }
        }
        if self.stack.len() == 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    /// Evaluate the sequence, then fold the result through the slope's span
    /// geometry and coverage ramp to produce a final X-major coverage value.
    ///
    /// This is the fixed scaffolding formula: the program supplies the ramp
    /// index (typically an expression over x and the span bounds) and the
    /// slope contributes the precomputed step, bias, wrap and edge
    /// orientation.
    pub fn eval_x_major(&mut self, genes: &[Gene], slope: &Slope) -> Option<i32> {
        let index = self.eval(genes)?;
        Some(slope.aa_coverage(index, self.y))
    }

    fn unary(&mut self, f: impl FnOnce(i32) -> i32) -> bool {
        let Some(v) = self.stack.pop() else {
            return false;
        };
        self.stack.push(f(v));
        true
    }

    fn binary(&mut self, f: impl FnOnce(i32, i32) -> i32) -> bool {
        let len = self.stack.len();
        if len < 2 {
            return false;
        }
        let b = self.stack[len - 1];
        let a = self.stack[len - 2];
        self.stack.truncate(len - 2);
        self.stack.push(f(a, b));
        true
    }
}

/// Division saturating to `i32::MAX` on divisor 0 and on `i32::MIN / -1`.
fn checked_div(a: i32, b: i32) -> i32 {
    a.checked_div(b).unwrap_or(i32::MAX)
}

/// Modulo resolving to 0 on divisor 0 and on `i32::MIN % -1`.
fn checked_mod(a: i32, b: i32) -> i32 {
    a.checked_rem(b).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EvalContext {
        EvalContext::new(9, 3, 15, 6, true)
    }

    fn program(ops: &[Op]) -> Vec<Gene> {
        ops.iter().map(|&op| Gene::new(op, true)).collect()
    }

    #[test]
    fn test_variables_and_arithmetic() {
        let genes = program(&[Op::PushX, Op::PushY, Op::Add]);
        assert_eq!(ctx().eval(&genes), Some(12));

        let genes = program(&[Op::PushWidth, Op::PushHeight, Op::Sub]);
        assert_eq!(ctx().eval(&genes), Some(9));

        let genes = program(&[Op::PushConst(7), Op::PushConst(3), Op::Mul]);
        assert_eq!(ctx().eval(&genes), Some(21));
    }

    #[test]
    fn test_division_sentinels() {
        let genes = program(&[Op::PushConst(5), Op::PushConst(0), Op::Div]);
        assert_eq!(ctx().eval(&genes), Some(i32::MAX));

        let genes = program(&[Op::PushConst(i32::MIN), Op::PushConst(-1), Op::Div]);
        assert_eq!(ctx().eval(&genes), Some(i32::MAX));

        let genes = program(&[Op::PushConst(5), Op::PushConst(0), Op::Mod]);
        assert_eq!(ctx().eval(&genes), Some(0));

        let genes = program(&[Op::PushConst(i32::MIN), Op::PushConst(-1), Op::Mod]);
        assert_eq!(ctx().eval(&genes), Some(0));
    }

    #[test]
    fn test_shift_semantics() {
        let genes = program(&[Op::PushConst(-8), Op::PushConst(1), Op::Sar]);
        assert_eq!(ctx().eval(&genes), Some(-4));

        let genes = program(&[Op::PushConst(-8), Op::PushConst(1), Op::Shr]);
        assert_eq!(ctx().eval(&genes), Some((-8i32 as u32 >> 1) as i32));

        // Shift counts wrap at 32.
        let genes = program(&[Op::PushConst(1), Op::PushConst(33), Op::Shl]);
        assert_eq!(ctx().eval(&genes), Some(2));
    }

    #[test]
    fn test_stack_ops() {
        let genes = program(&[Op::PushConst(3), Op::Dup, Op::Mul]);
        assert_eq!(ctx().eval(&genes), Some(9));

        let genes = program(&[Op::PushConst(8), Op::PushConst(2), Op::Swap, Op::Div]);
        assert_eq!(ctx().eval(&genes), Some(0));

        assert_eq!(ctx().eval(&program(&[Op::Dup])), None);
        assert_eq!(ctx().eval(&program(&[Op::PushConst(1), Op::Swap])), None);
    }

    #[test]
    fn test_underflow_and_final_depth() {
        // Pop from an empty stack fails.
        assert_eq!(ctx().eval(&program(&[Op::Add])), None);
        // Zero values left at termination fails.
        assert_eq!(ctx().eval(&program(&[])), None);
        // More than one value left fails.
        let genes = program(&[Op::PushConst(1), Op::PushConst(2)]);
        assert_eq!(ctx().eval(&genes), None);
    }

    #[test]
    fn test_disabled_genes_are_skipped() {
        let genes = vec![
            Gene::new(Op::PushConst(4), true),
            Gene::new(Op::PushConst(100), false),
            Gene::new(Op::Neg, false),
            Gene::new(Op::PushConst(2), true),
            Gene::new(Op::Add, true),
        ];
        assert_eq!(ctx().eval(&genes), Some(6));
    }

    #[test]
    fn test_fixed_point_helpers() {
        let genes = program(&[Op::PushConst(3), Op::ToFrac, Op::Trunc]);
        assert_eq!(ctx().eval(&genes), Some(3));

        let genes = program(&[Op::PushConst(6), Op::Recip]);
        assert_eq!(ctx().eval(&genes), Some(ONE / 6));

        let genes = program(&[Op::PushConst(0), Op::Recip]);
        assert_eq!(ctx().eval(&genes), Some(i32::MAX));

        // The composite matches the hardware increment trick: 15 * (ONE / 6).
        let genes = program(&[Op::PushWidth, Op::MulHeightRecip]);
        assert_eq!(ctx().eval(&genes), Some(15 * (ONE / 6)));
    }

    #[test]
    fn test_eval_x_major_oracle() {
        // EvalXMajor over `push x` reproduces the captured hardware coverage
        // for a left, positive 15x6 slope.
        let slope = Slope::setup(0, 0, 15, 6, true);
        let genes = program(&[Op::PushX]);

        let cases = [((0, 0), 6), ((1, 0), 19), ((3, 1), 12), ((9, 3), 25)];
        for ((x, y), expected) in cases {
            let mut ctx = EvalContext::new(x, y, 15, 6, true);
            assert_eq!(ctx.eval_x_major(&genes, &slope), Some(expected));
        }
    }

    #[test]
    fn test_eval_is_pure() {
        let slope = Slope::setup(0, 0, 15, 6, true);
        let genes = program(&[Op::PushX, Op::PushY, Op::Mul, Op::PushWidth, Op::Mod]);
        let mut ctx = EvalContext::new(9, 3, 15, 6, true);
        let first = ctx.eval(&genes);
        assert!(first.is_some());
        assert_eq!(ctx.eval(&genes), first);
        let folded = ctx.eval_x_major(&genes, &slope);
        assert_eq!(ctx.eval_x_major(&genes, &slope), folded);
    }
}
