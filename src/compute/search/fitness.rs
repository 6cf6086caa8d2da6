//! Chromosome scoring against the fixed sample dataset.

use crate::compute::eval::EvalContext;
use crate::compute::ops::Gene;
use crate::schema::ExtendedSample;

use super::chromosome::INVALID_FITNESS;

/// Score a program: total absolute error against every sample, or
/// [`INVALID_FITNESS`] as soon as any evaluation fails.
///
/// A fitness of exactly 0 means a perfect match across the whole dataset.
pub fn score(genes: &[Gene], samples: &[ExtendedSample]) -> u64 {
    let mut total = 0u64;
    for extended in samples {
        let s = &extended.sample;
        let mut ctx = EvalContext::new(s.x, s.y, s.width, s.height, extended.left);
        match ctx.eval_x_major(genes, &extended.slope) {
            Some(predicted) => {
                let predicted = predicted.clamp(0, extended.bound);
                total += predicted.abs_diff(s.coverage) as u64;
            }
            None => return INVALID_FITNESS,
        }
    }
    total
}
