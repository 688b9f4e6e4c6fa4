use std::ops::Deref;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, trace};

use super::error::EncodingError;
use super::metadata::Color;
use crate::builder::QR;

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub const fn new(pattern: u8) -> Self {
        debug_assert!(pattern < 8, "Invalid masking pattern");
        Self(pattern)
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u8> for MaskPattern {
    type Error = EncodingError;
    fn try_from(pattern: u8) -> Result<Self, Self::Error> {
        if pattern < 8 {
            Ok(Self(pattern))
        } else {
            Err(EncodingError::InvalidMaskPattern(pattern))
        }
    }
}

// Arguments are (row, column)
mod mask_functions {
    pub fn checkerboard(r: i16, c: i16) -> bool {
        (r + c) & 1 == 0
    }

    pub fn horizontal_lines(r: i16, _: i16) -> bool {
        r & 1 == 0
    }

    pub fn vertical_lines(_: i16, c: i16) -> bool {
        c % 3 == 0
    }

    pub fn diagonal_lines(r: i16, c: i16) -> bool {
        (r + c) % 3 == 0
    }

    pub fn large_checkerboard(r: i16, c: i16) -> bool {
        ((r >> 1) + (c / 3)) & 1 == 0
    }

    pub fn fields(r: i16, c: i16) -> bool {
        ((r * c) & 1) + ((r * c) % 3) == 0
    }

    pub fn diamonds(r: i16, c: i16) -> bool {
        (((r * c) & 1) + ((r * c) % 3)) & 1 == 0
    }

    pub fn meadow(r: i16, c: i16) -> bool {
        (((r + c) & 1) + ((r * c) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    pub fn mask_function(self) -> fn(i16, i16) -> bool {
        match self.0 {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            _ => mask_functions::meadow,
        }
    }
}

#[cfg(test)]
mod mask_function_tests {
    use test_case::test_case;

    use super::MaskPattern;

    #[test_case(0, &[(0, 0), (1, 1), (2, 4)], &[(0, 1), (3, 4)])]
    #[test_case(1, &[(0, 5), (2, 1)], &[(1, 0), (3, 3)])]
    #[test_case(2, &[(1, 0), (5, 3)], &[(0, 1), (0, 2)])]
    #[test_case(3, &[(0, 0), (1, 2), (4, 5)], &[(0, 1), (1, 1)])]
    #[test_case(4, &[(0, 0), (1, 2), (2, 3)], &[(0, 3), (2, 0)])]
    #[test_case(5, &[(0, 7), (6, 1), (2, 3)], &[(1, 1), (5, 7)])]
    #[test_case(6, &[(0, 3), (1, 1), (2, 4)], &[(1, 3), (1, 5)])]
    #[test_case(7, &[(0, 0), (1, 3), (1, 4)], &[(0, 1), (1, 1)])]
    fn test_mask_function(pattern: u8, flipped: &[(i16, i16)], kept: &[(i16, i16)]) {
        let f = MaskPattern::new(pattern).mask_function();
        assert!(flipped.iter().all(|&(r, c)| f(r, c)));
        assert!(kept.iter().all(|&(r, c)| !f(r, c)));
    }

    #[test]
    fn test_try_from() {
        assert_eq!(MaskPattern::try_from(7).map(|m| *m), Ok(7));
        assert!(MaskPattern::try_from(8).is_err());
    }
}

// Mask selection
//------------------------------------------------------------------------------

/// Applies every mask to a copy of the symbol and keeps the one with the
/// lowest penalty. Ties go to the lower pattern number.
pub fn apply_best_mask(qr: &mut QR) -> MaskPattern {
    let score = |m: u8| {
        let mut qr = qr.clone();
        qr.apply_mask(MaskPattern(m));
        let pen = compute_total_penalty(&qr);
        trace!(mask = m, penalty = pen, "Scored mask");
        pen
    };

    #[cfg(not(feature = "parallel"))]
    let best_mask = (0..8u8).min_by_key(|&m| score(m)).unwrap_or(0);
    #[cfg(feature = "parallel")]
    let best_mask = (0..8u8).into_par_iter().min_by_key(|&m| score(m)).unwrap_or(0);

    let best_mask = MaskPattern(best_mask);
    debug!(mask = *best_mask, "Selected mask");
    qr.apply_mask(best_mask);
    best_mask
}

pub fn compute_total_penalty(qr: &QR) -> u32 {
    let adj_pen = compute_adjacent_penalty(qr);
    let blk_pen = compute_block_penalty(qr);
    let fp_pen = compute_finder_pattern_penalty(qr);
    let bal_pen = compute_balance_penalty(qr);
    adj_pen + blk_pen + fp_pen + bal_pen
}

fn rows_and_cols(qr: &QR) -> impl Iterator<Item = Vec<Color>> + '_ {
    let w = qr.width() as i16;
    let rows = (0..w).map(move |r| (0..w).map(|c| *qr.get(r, c)).collect::<Vec<_>>());
    let cols = (0..w).map(move |c| (0..w).map(|r| *qr.get(r, c)).collect::<Vec<_>>());
    rows.chain(cols)
}

// 3 for a run of five same colored modules, plus 1 per extra module
fn compute_adjacent_penalty(qr: &QR) -> u32 {
    let mut pen = 0;
    for line in rows_and_cols(qr) {
        let mut last = line[0];
        let mut run = 0;
        for &clr in &line {
            if clr == last {
                run += 1;
                continue;
            }
            if run >= 5 {
                pen += run - 2;
            }
            last = clr;
            run = 1;
        }
        if run >= 5 {
            pen += run - 2;
        }
    }
    pen
}

fn compute_block_penalty(qr: &QR) -> u32 {
    let mut pen = 0;
    let w = qr.width() as i16;
    for r in 0..w - 1 {
        for c in 0..w - 1 {
            let clr = *qr.get(r, c);
            if clr == *qr.get(r + 1, c) && clr == *qr.get(r, c + 1) && clr == *qr.get(r + 1, c + 1)
            {
                pen += 3;
            }
        }
    }
    pen
}

// 40 per 1:1:3:1:1 run with four light modules on either side. Modules past
// the edge count as light.
fn compute_finder_pattern_penalty(qr: &QR) -> u32 {
    use Color::{Dark as D, Light as L};
    static PATTERN: [Color; 7] = [D, L, D, D, D, L, D];
    static QUIET: [Color; 4] = [L, L, L, L];

    let mut pen = 0;
    for line in rows_and_cols(qr) {
        let mut padded = Vec::with_capacity(line.len() + 8);
        padded.extend(QUIET);
        padded.extend(line);
        padded.extend(QUIET);
        for k in 4..padded.len() - 10 {
            if padded[k..k + 7] != PATTERN {
                continue;
            }
            if padded[k - 4..k] == QUIET || padded[k + 7..k + 11] == QUIET {
                pen += 40;
            }
        }
    }
    pen
}

// 10 per full 5% step away from an even dark/light split
fn compute_balance_penalty(qr: &QR) -> u32 {
    let dark = qr.count_dark_modules() as u32;
    let w = qr.width() as u32;
    let total = w * w;
    let deviation = (dark * 20).abs_diff(total * 10) / total;
    deviation * 10
}
