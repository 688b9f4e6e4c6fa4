use super::metadata::Version;

// Iterator for placing data in encoding region of QR
//------------------------------------------------------------------------------

/// Walks the symbol in column pairs from the bottom right corner, alternating
/// upward and downward, right module before left. The vertical timing column
/// is skipped. Function modules are yielded too; callers filter them.
pub struct EncRegionIter {
    // Right column of the current pair
    right: i16,
    // Rows walked within the current pair
    vert: i16,
    // 0 for the right module, 1 for the left
    side: i16,
    width: i16,
}

impl EncRegionIter {
    const VERT_TIMING_COL: i16 = 6;

    pub const fn new(version: Version) -> Self {
        let w = version.width() as i16;
        Self { right: w - 1, vert: 0, side: 0, width: w }
    }
}

impl Iterator for EncRegionIter {
    type Item = (i16, i16);

    fn next(&mut self) -> Option<Self::Item> {
        if self.right < 1 {
            return None;
        }

        let c = self.right - self.side;
        let upward = (self.right + 1) & 2 == 0;
        let r = if upward { self.width - 1 - self.vert } else { self.vert };

        self.side += 1;
        if self.side == 2 {
            self.side = 0;
            self.vert += 1;
            if self.vert == self.width {
                self.vert = 0;
                self.right -= 2;
                if self.right == Self::VERT_TIMING_COL {
                    self.right -= 1;
                }
            }
        }

        Some((r, c))
    }
}
