//! Fixed-point slope interpolation model.
//!
//! Replicates the target rasterizer's per-scanline span interpolation bit-exactly,
//! including its rounding and truncation quirks. Positions carry 18 fractional bits;
//! antialiasing coverage is a 5-bit value (0..=31) with extra ramp precision kept
//! internally.

/// Number of fractional bits in slope fixed-point coordinates.
pub const FRAC_BITS: u32 = 18;
/// One pixel in slope fixed-point.
pub const ONE: i32 = 1 << FRAC_BITS;
/// Half-pixel bias applied to the origin of X-major and diagonal slopes.
pub const BIAS: i32 = ONE >> 1;
/// Fractional part mask.
pub const MASK: i32 = ONE - 1;
/// Mask over the low half of the fractional bits.
///
/// X-major span ends discard these bits before stepping, which is what produces
/// the hardware's one-pixel gap on aspect ratios such as 69:49.
pub const LOW_MASK: i32 = (1 << (FRAC_BITS / 2)) - 1;

/// Number of fractional bits carried by [`Slope::frac_aa_coverage`] values.
pub const AA_BITS: u32 = 5;
/// Coverage wraps modulo this base; final values are `0..AA_RANGE`.
pub const AA_RANGE: i32 = 1 << AA_BITS;

/// Ramp precision for X-major coverage steps (half the slope precision,
/// matching the span-end mask).
const AA_X_FRAC: u32 = FRAC_BITS / 2;
/// Ramp precision for Y-major coverage steps.
const AA_Y_FRAC: u32 = FRAC_BITS;

/// A rasterizer line/edge between two endpoints, producing one span (X-major)
/// or one pixel (Y-major) per scanline.
///
/// Immutable after configuration: [`Slope::setup`] computes every derived
/// attribute from scratch, and all query methods are pure functions of that
/// state. Internally the slope is always normalized so `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slope {
    /// Origin X in fixed-point, bias already applied.
    x0: i32,
    /// Origin Y (integer scanline).
    y0: i32,
    /// Absolute horizontal extent of the original endpoints.
    width: i32,
    /// Absolute vertical extent of the original endpoints.
    height: i32,
    /// X decreases as Y increases.
    negative: bool,
    x_major: bool,
    diagonal: bool,
    /// Left edge of the polygon (coverage ramps up); right edges invert.
    left: bool,
    /// Per-scanline X increment, always positive.
    dx: i32,
    /// Coverage ramp step in the majority-specific ramp precision.
    aa_step: i64,
    /// Half-step bias added before truncating coverage.
    aa_bias: i64,
}

impl Slope {
    /// Configure a slope from two endpoints.
    ///
    /// `left` selects the polygon side the edge belongs to; it only affects
    /// coverage orientation, never span interpolation.
    pub fn setup(x0: i32, y0: i32, x1: i32, y1: i32, left: bool) -> Self {
        let (mut x0, y0, mut x1, y1) = if y1 < y0 {
            (x1, y1, x0, y0)
        } else {
            (x0, y0, x1, y1)
        };

        let mut x0_frac = x0 << FRAC_BITS;

        // Negative slopes start one raw unit to the left; the increment is then
        // always computed from the swapped (positive) extent.
        let negative = x1 < x0;
        if negative {
            x0_frac -= 1;
            std::mem::swap(&mut x0, &mut x1);
        }

        let width = x1 - x0;
        let height = y1 - y0;
        let x_major = width > height;
        let diagonal = width == height;

        if x_major || diagonal {
            if negative {
                x0_frac -= BIAS;
            } else {
                x0_frac += BIAS;
            }
        }

        // The hardware computes the reciprocal first and truncates it before
        // multiplying, trading precision to avoid a wide intermediate.
        let dx = if height != 0 {
            width * (ONE / height)
        } else {
            width << FRAC_BITS
        };

        let (aa_step, aa_bias) = aa_ramp(width, height, x_major, diagonal);

        Self {
            x0: x0_frac,
            y0,
            width,
            height,
            negative,
            x_major,
            diagonal,
            left,
            dx,
            aa_step,
            aa_bias,
        }
    }

    /// Absolute horizontal extent of the original endpoints.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Absolute vertical extent of the original endpoints.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// True if X decreases as Y increases.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// True if the horizontal extent exceeds the vertical extent.
    #[inline]
    pub fn is_x_major(&self) -> bool {
        self.x_major
    }

    /// True if both extents are equal.
    #[inline]
    pub fn is_diagonal(&self) -> bool {
        self.diagonal
    }

    /// True if this edge sits on the left side of its polygon.
    #[inline]
    pub fn is_left_edge(&self) -> bool {
        self.left
    }

    /// Span start for scanline `y`, in fixed-point.
    #[inline]
    pub fn frac_x_start(&self, y: i32) -> i32 {
        let offset = (y - self.y0) * self.dx;
        if self.negative {
            self.x0 - offset
        } else {
            self.x0 + offset
        }
    }

    /// Span end for scanline `y`, in fixed-point.
    ///
    /// X-major slopes round the start toward the leading edge by discarding the
    /// low half of the fractional bits, then step once and back off a full
    /// pixel. Negative slopes apply the mirror-image (ceiling) operation. The
    /// discarded bits are what open the one-pixel gap on ratios like 69:49;
    /// that behavior is intentional and preserved exactly.
    pub fn frac_x_end(&self, y: i32) -> i32 {
        let start = self.frac_x_start(y);
        if !self.x_major {
            return start;
        }
        if self.negative {
            (start | LOW_MASK) - self.dx + ONE
        } else {
            (start & !LOW_MASK) + self.dx - ONE
        }
    }

    /// First covered pixel of the span on scanline `y`.
    #[inline]
    pub fn x_start(&self, y: i32) -> i32 {
        self.frac_x_start(y) >> FRAC_BITS
    }

    /// Last covered pixel of the span on scanline `y`.
    #[inline]
    pub fn x_end(&self, y: i32) -> i32 {
        self.frac_x_end(y) >> FRAC_BITS
    }

    /// Antialiasing coverage ramp value at `(x, y)`, with [`AA_BITS`]
    /// fractional bits and the periodic wrap already applied.
    ///
    /// Coordinates are relative to the slope origin. The Y-major branch and
    /// several edge/orientation combinations are known-incomplete against
    /// hardware; the formula is kept as documented rather than "corrected",
    /// since discovering the true expression is the whole point of the search.
    pub fn frac_aa_coverage(&self, x: i32, y: i32) -> i32 {
        if self.width == 0 || self.height == 0 {
            // Perfectly vertical or horizontal: full coverage.
            return (AA_RANGE - 1) << AA_BITS;
        }
        if self.diagonal {
            // Equal extents: the range midpoint.
            return (AA_RANGE / 2) << AA_BITS;
        }

        let (index, frac) = if self.x_major {
            (x as i64, AA_X_FRAC)
        } else {
            ((y - self.y0) as i64, AA_Y_FRAC)
        };

        let base = (AA_RANGE as i64) << frac;
        let ramp = (index * self.aa_step + self.aa_bias).rem_euclid(base);
        (ramp >> (frac - AA_BITS)) as i32
    }

    /// Final integer coverage at `(x, y)`, in `0..AA_RANGE`.
    ///
    /// Right edges see the inverted ramp.
    pub fn aa_coverage(&self, x: i32, y: i32) -> i32 {
        let value = self.frac_aa_coverage(x, y) >> AA_BITS;
        if self.left {
            value
        } else {
            AA_RANGE - 1 - value
        }
    }
}

/// Precompute the coverage ramp step and half-step bias.
///
/// X-major ramps over X with `height/width`; Y-major ramps over Y with the
/// inverted ratio and finer fractional scaling.
fn aa_ramp(width: i32, height: i32, x_major: bool, diagonal: bool) -> (i64, i64) {
    if width == 0 || height == 0 || diagonal {
        return (0, 0);
    }
    let step = if x_major {
        (height as i64 * ((AA_RANGE as i64) << AA_X_FRAC)) / width as i64
    } else {
        (width as i64 * ((AA_RANGE as i64) << AA_Y_FRAC)) / height as i64
    };
    (step, step >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extents_match_endpoint_deltas() {
        let s = Slope::setup(3, 10, 18, 16, true);
        assert_eq!(s.width(), 15);
        assert_eq!(s.height(), 6);
        assert!(s.is_x_major());
        assert!(!s.is_diagonal());
        assert!(!s.is_negative());

        // Extents are absolute regardless of endpoint order.
        let r = Slope::setup(18, 16, 3, 10, true);
        assert_eq!(r.width(), 15);
        assert_eq!(r.height(), 6);
    }

    #[test]
    fn test_classification() {
        assert!(Slope::setup(0, 0, 10, 3, true).is_x_major());
        assert!(!Slope::setup(0, 0, 3, 10, true).is_x_major());
        assert!(Slope::setup(0, 0, 7, 7, true).is_diagonal());
        assert!(Slope::setup(7, 0, 0, 7, true).is_negative());
    }

    #[test]
    fn test_setup_is_deterministic() {
        let a = Slope::setup(0, 0, 69, 49, true);
        let b = Slope::setup(0, 0, 69, 49, true);
        assert_eq!(a, b);
        for y in 0..49 {
            assert_eq!(a.frac_x_start(y), b.frac_x_start(y));
            assert_eq!(a.frac_x_end(y), b.frac_x_end(y));
        }
    }

    #[test]
    fn test_x_major_spans() {
        let s = Slope::setup(0, 0, 15, 6, true);
        let spans: Vec<(i32, i32)> = (0..6).map(|y| (s.x_start(y), s.x_end(y))).collect();
        assert_eq!(spans, vec![(0, 1), (2, 4), (5, 6), (7, 9), (10, 11), (12, 14)]);
    }

    #[test]
    fn test_negative_x_major_spans_mirror() {
        let s = Slope::setup(15, 0, 0, 6, true);
        assert!(s.is_negative());
        // Spans walk right to left; x_end is the leading (left) side.
        assert_eq!((s.x_end(0), s.x_start(0)), (13, 14));
        assert_eq!((s.x_end(5), s.x_start(5)), (0, 2));
    }

    #[test]
    fn test_one_pixel_gap_artifact() {
        // The low-fractional-bit masking opens a gap between scanlines 37 and
        // 38 on a 69:49 slope. The model must reproduce it, not smooth it over.
        let s = Slope::setup(0, 0, 69, 49, true);
        assert_eq!(s.x_end(37), 52);
        assert_eq!(s.x_start(38), 54);

        let gaps = (0..48)
            .filter(|&y| s.x_start(y + 1) > s.x_end(y) + 1)
            .count();
        assert_eq!(gaps, 1);
    }

    #[test]
    fn test_x_major_coverage_oracle() {
        // Literal values from the captured hardware dataset.
        let s = Slope::setup(0, 0, 15, 6, true);
        assert_eq!(s.aa_coverage(0, 0), 6);
        assert_eq!(s.aa_coverage(1, 0), 19);
        assert_eq!(s.aa_coverage(3, 1), 12);
        assert_eq!(s.aa_coverage(9, 3), 25);
    }

    #[test]
    fn test_coverage_wraps_periodically() {
        let s = Slope::setup(0, 0, 15, 6, true);
        // Ramp period is width/height pixels scaled to the coverage base; the
        // pattern repeats every 5 pixels for a 15:6 slope.
        for x in 0..10 {
            assert_eq!(s.aa_coverage(x, 0), s.aa_coverage(x + 5, 0));
        }
    }

    #[test]
    fn test_degenerate_and_diagonal_coverage() {
        let horizontal = Slope::setup(0, 0, 12, 0, true);
        assert_eq!(horizontal.aa_coverage(4, 0), AA_RANGE - 1);

        let vertical = Slope::setup(0, 0, 0, 12, true);
        assert_eq!(vertical.aa_coverage(0, 4), AA_RANGE - 1);

        let diagonal = Slope::setup(0, 0, 9, 9, true);
        assert_eq!(diagonal.aa_coverage(4, 4), AA_RANGE / 2);
    }

    #[test]
    fn test_right_edge_inverts_coverage() {
        let left = Slope::setup(0, 0, 15, 6, true);
        let right = Slope::setup(0, 0, 15, 6, false);
        for x in 0..15 {
            assert_eq!(right.aa_coverage(x, 0), AA_RANGE - 1 - left.aa_coverage(x, 0));
        }
    }
}
