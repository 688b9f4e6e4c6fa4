use std::ops::Deref;

use image::{GrayImage, Luma};

use crate::common::{
    iter::EncRegionIter,
    mask::MaskPattern,
    metadata::{format_info_qr, Color, ECLevel, Version},
};
use crate::render::rasterize;

/// A single cell of the symbol, tagged with the structure it belongs to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Module {
    Empty,
    Func(Color),
    Version(Color),
    Format(Color),
    Data(Color),
}

impl Deref for Module {
    type Target = Color;
    fn deref(&self) -> &Self::Target {
        match self {
            Module::Empty => &Color::Light,
            Module::Func(c) => c,
            Module::Version(c) => c,
            Module::Format(c) => c,
            Module::Data(c) => c,
        }
    }
}

/// Module matrix of an encoded symbol. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QR {
    grid: Vec<Module>,
    w: usize,
    ver: Version,
    ecl: ECLevel,
    mask: Option<MaskPattern>,
}

// QR type for builder
//------------------------------------------------------------------------------

impl QR {
    pub(crate) fn new(ver: Version, ecl: ECLevel) -> Self {
        let w = ver.width();
        Self { grid: vec![Module::Empty; w * w], w, ver, ecl, mask: None }
    }

    pub fn version(&self) -> Version {
        self.ver
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ecl
    }

    pub fn mask(&self) -> Option<MaskPattern> {
        self.mask
    }

    /// Module at row `r`, column `c`. Panics if out of bounds.
    pub fn module(&self, r: usize, c: usize) -> Module {
        assert!(r < self.w && c < self.w, "Module out of bounds: ({r}, {c})");
        self.grid[r * self.w + c]
    }

    pub fn is_dark(&self, r: usize, c: usize) -> bool {
        *self.module(r, c) == Color::Dark
    }

    /// True for finder, separator, timing, alignment, format and version modules.
    pub fn is_function(&self, r: usize, c: usize) -> bool {
        matches!(self.module(r, c), Module::Func(_) | Module::Version(_) | Module::Format(_))
    }

    pub fn count_dark_modules(&self) -> usize {
        self.grid.iter().filter(|&m| matches!(**m, Color::Dark)).count()
    }

    #[cfg(test)]
    pub(crate) fn to_debug_str(&self) -> String {
        let w = self.w as i16;
        let mut res = String::with_capacity((w * (w + 1) + 1) as usize);
        res.push('\n');
        for i in 0..w {
            for j in 0..w {
                let c = match self.get(i, j) {
                    Module::Empty => '.',
                    Module::Func(Color::Dark) => 'f',
                    Module::Func(Color::Light) => 'F',
                    Module::Version(Color::Dark) => 'v',
                    Module::Version(Color::Light) => 'V',
                    Module::Format(Color::Dark) => 'm',
                    Module::Format(Color::Light) => 'M',
                    Module::Data(Color::Dark) => 'd',
                    Module::Data(Color::Light) => 'D',
                };
                res.push(c);
            }
            res.push('\n');
        }
        res
    }

    // Negative coordinates count back from the last row or column
    fn coord_to_index(&self, r: i16, c: i16) -> usize {
        let w = self.w as i16;
        debug_assert!(-w <= r && r < w, "Row out of bounds: {r}");
        debug_assert!(-w <= c && c < w, "Column out of bounds: {c}");

        let r = if r < 0 { r + w } else { r };
        let c = if c < 0 { c + w } else { c };
        (r * w + c) as _
    }

    pub(crate) fn get(&self, r: i16, c: i16) -> Module {
        self.grid[self.coord_to_index(r, c)]
    }

    pub(crate) fn set(&mut self, r: i16, c: i16, module: Module) {
        let index = self.coord_to_index(r, c);
        self.grid[index] = module;
    }
}


// Finder pattern
//------------------------------------------------------------------------------

impl QR {
    fn draw_finder_patterns(&mut self) {
        self.draw_finder_pattern_at(3, 3);
        self.draw_finder_pattern_at(3, -4);
        self.draw_finder_pattern_at(-4, 3);
    }

    // Draws the 7x7 pattern centred on (r, c) along with its light separator,
    // clipped to the symbol
    fn draw_finder_pattern_at(&mut self, r: i16, c: i16) {
        let (dr_top, dr_bottom) = if r > 0 { (-3, 4) } else { (-4, 3) };
        let (dc_left, dc_right) = if c > 0 { (-3, 4) } else { (-4, 3) };
        for i in dr_top..=dr_bottom {
            for j in dc_left..=dc_right {
                let module = match i16::max(i16::abs(i), i16::abs(j)) {
                    4 | 2 => Module::Func(Color::Light),
                    _ => Module::Func(Color::Dark),
                };
                self.set(r + i, c + j, module);
            }
        }
    }
}

#[cfg(test)]
mod finder_pattern_tests {
    use super::QR;
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_finder_pattern_qr() {
        let mut qr = QR::new(Version::new(1), ECLevel::L);
        qr.draw_finder_patterns();
        assert_eq!(
            qr.to_debug_str(),
            "\n\
             fffffffF.....Ffffffff\n\
             fFFFFFfF.....FfFFFFFf\n\
             fFfffFfF.....FfFfffFf\n\
             fFfffFfF.....FfFfffFf\n\
             fFfffFfF.....FfFfffFf\n\
             fFFFFFfF.....FfFFFFFf\n\
             fffffffF.....Ffffffff\n\
             FFFFFFFF.....FFFFFFFF\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             FFFFFFFF.............\n\
             fffffffF.............\n\
             fFFFFFfF.............\n\
             fFfffFfF.............\n\
             fFfffFfF.............\n\
             fFfffFfF.............\n\
             fFFFFFfF.............\n\
             fffffffF.............\n"
        );
    }
}

// Timing pattern
//------------------------------------------------------------------------------

impl QR {
    fn draw_timing_pattern(&mut self) {
        let last = self.w as i16 - 9;
        self.draw_line(6, 8, 6, last);
        self.draw_line(8, 6, last, 6);
    }

    fn draw_line(&mut self, r1: i16, c1: i16, r2: i16, c2: i16) {
        debug_assert!(r1 == r2 || c1 == c2, "Line is neither vertical nor horizontal");

        let timing_module = |i: i16| Module::Func(Color::from(i & 1 == 0));
        if r1 == r2 {
            for j in c1..=c2 {
                self.set(r1, j, timing_module(j));
            }
        } else {
            for i in r1..=r2 {
                self.set(i, c1, timing_module(i));
            }
        }
    }
}


// Alignment pattern
//------------------------------------------------------------------------------

impl QR {
    fn draw_alignment_patterns(&mut self) {
        let poses = self.ver.alignment_pattern();
        for &r in poses {
            for &c in poses {
                self.draw_alignment_pattern_at(r, c)
            }
        }
    }

    fn draw_alignment_pattern_at(&mut self, r: i16, c: i16) {
        let last = self.w as i16 - 7;
        if (r == 6 && (c == 6 || c == last)) || (r == last && c == 6) {
            return;
        }
        for i in -2..=2 {
            for j in -2..=2 {
                let module = match i16::max(i16::abs(i), i16::abs(j)) {
                    1 => Module::Func(Color::Light),
                    _ => Module::Func(Color::Dark),
                };
                self.set(r + i, c + j, module);
            }
        }
    }
}


impl QR {
    pub(crate) fn draw_all_function_patterns(&mut self) {
        self.draw_finder_patterns();
        self.draw_timing_pattern();
        self.draw_alignment_patterns();
        self.reserve_format_area();
        self.draw_version_info();
    }
}

#[cfg(test)]
mod all_function_patterns_test {
    use super::QR;
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_all_function_patterns() {
        let mut qr = QR::new(Version::new(3), ECLevel::L);
        qr.draw_finder_patterns();
        qr.draw_timing_pattern();
        qr.draw_alignment_patterns();
        assert_eq!(
            qr.to_debug_str(),
            "\n\
             fffffffF.............Ffffffff\n\
             fFFFFFfF.............FfFFFFFf\n\
             fFfffFfF.............FfFfffFf\n\
             fFfffFfF.............FfFfffFf\n\
             fFfffFfF.............FfFfffFf\n\
             fFFFFFfF.............FfFFFFFf\n\
             fffffffFfFfFfFfFfFfFfFfffffff\n\
             FFFFFFFF.............FFFFFFFF\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f......................\n\
             ......F......................\n\
             ......f.............fffff....\n\
             FFFFFFFF............fFFFf....\n\
             fffffffF............fFfFf....\n\
             fFFFFFfF............fFFFf....\n\
             fFfffFfF............fffff....\n\
             fFfffFfF.....................\n\
             fFfffFfF.....................\n\
             fFFFFFfF.....................\n\
             fffffffF.....................\n"
        );
    }

    #[test]
    fn test_empty_modules_hold_all_codewords() {
        for v in 1..=40 {
            let ver = Version::new(v);
            let mut qr = QR::new(ver, ECLevel::L);
            qr.draw_all_function_patterns();
            let empty = qr.to_debug_str().matches('.').count();
            assert_eq!(empty, ver.total_codewords() * 8 + ver.remainder_bits(), "{ver:?}");
        }
    }
}

// Format & version info
//------------------------------------------------------------------------------

impl QR {
    fn reserve_format_area(&mut self) {
        self.draw_format_info(0);
        self.set(-8, 8, Module::Func(Color::Dark));
    }

    fn draw_format_info(&mut self, format_info: u32) {
        let off = Module::Format(Color::Light);
        let on = Module::Format(Color::Dark);
        self.draw_number(format_info, FORMAT_INFO_BIT_LEN, off, on, &FORMAT_INFO_COORDS_QR_MAIN);
        self.draw_number(format_info, FORMAT_INFO_BIT_LEN, off, on, &FORMAT_INFO_COORDS_QR_SIDE);
    }

    fn draw_version_info(&mut self) {
        if *self.ver < 7 {
            return;
        }
        let ver_info = self.ver.info();
        let off = Module::Version(Color::Light);
        let on = Module::Version(Color::Dark);
        self.draw_number(ver_info, VERSION_INFO_BIT_LEN, off, on, &VERSION_INFO_COORDS_TR);
        self.draw_number(ver_info, VERSION_INFO_BIT_LEN, off, on, &VERSION_INFO_COORDS_BL);
    }

    // Coordinates are listed most significant bit first
    fn draw_number(
        &mut self,
        number: u32,
        bit_len: usize,
        off_clr: Module,
        on_clr: Module,
        coords: &[(i16, i16)],
    ) {
        let mut mask = 1 << (bit_len - 1);
        for &(r, c) in coords {
            if number & mask == 0 {
                self.set(r, c, off_clr);
            } else {
                self.set(r, c, on_clr);
            }
            mask >>= 1;
        }
    }
}

#[cfg(test)]
mod qr_information_tests {
    use super::QR;
    use crate::common::{
        mask::MaskPattern,
        metadata::{format_info_qr, ECLevel, Version},
    };

    #[test]
    fn test_version_info_1() {
        let mut qr = QR::new(Version::new(1), ECLevel::L);
        qr.draw_version_info();
        assert!(qr.to_debug_str().chars().all(|c| c == '.' || c == '\n'));
    }

    #[test]
    fn test_version_info_7() {
        let mut qr = QR::new(Version::new(7), ECLevel::L);
        qr.draw_version_info();
        let s = qr.to_debug_str();
        let rows = s.lines().skip(1).collect::<Vec<_>>();
        // 0x07C94 = 000111 110010 010100, bit 0 at (0, w - 11)
        assert_eq!(&rows[0][34..37], "VVv");
        assert_eq!(&rows[1][34..37], "VvV");
        assert_eq!(&rows[2][34..37], "VvV");
        assert_eq!(&rows[3][34..37], "Vvv");
        assert_eq!(&rows[4][34..37], "vvv");
        assert_eq!(&rows[5][34..37], "VVV");
        for (i, row) in rows[34..37].iter().enumerate() {
            let col = rows[..6].iter().map(|r| &r[34 + i..35 + i]).collect::<String>();
            assert_eq!(&row[..6], col);
        }
        assert_eq!(s.matches(['v', 'V']).count(), 36);
    }

    #[test]
    fn test_reserve_format_info_qr() {
        let mut qr = QR::new(Version::new(1), ECLevel::L);
        qr.reserve_format_area();
        assert_eq!(
            qr.to_debug_str(),
            "\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             .....................\n\
             ........M............\n\
             MMMMMM.MM....MMMMMMMM\n\
             .....................\n\
             .....................\n\
             .....................\n\
             .....................\n\
             ........f............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n\
             ........M............\n"
        );
    }

    #[test]
    fn test_format_info_copies_match() {
        let mut qr = QR::new(Version::new(2), ECLevel::Q);
        let info = format_info_qr(ECLevel::Q, MaskPattern::new(3));
        qr.draw_format_info(info);
        let read = |coords: &[(i16, i16)]| {
            coords.iter().fold(0u32, |acc, &(r, c)| (acc << 1) | (*qr.get(r, c) as u32))
        };
        assert_eq!(read(&super::FORMAT_INFO_COORDS_QR_MAIN), info);
        assert_eq!(read(&super::FORMAT_INFO_COORDS_QR_SIDE), info);
    }
}

// Encoding region
//------------------------------------------------------------------------------

impl QR {
    /// Places codewords most significant bit first along the zigzag path.
    /// Modules left over once the payload runs out are remainder bits and
    /// stay light.
    pub(crate) fn draw_encoding_region(&mut self, payload: &[u8]) {
        let mut bits = payload.iter().flat_map(|&b| (0..8).rev().map(move |i| (b >> i) & 1 == 1));
        for (r, c) in EncRegionIter::new(self.ver) {
            if !matches!(self.get(r, c), Module::Empty) {
                continue;
            }
            let dark = bits.next().unwrap_or(false);
            self.set(r, c, Module::Data(Color::from(dark)));
        }

        debug_assert!(bits.next().is_none(), "Payload exceeds encoding region");
        debug_assert!(!self.grid.contains(&Module::Empty), "Empty module found");
    }

    /// Flips data modules selected by the pattern and writes the matching
    /// format info.
    pub(crate) fn apply_mask(&mut self, pattern: MaskPattern) {
        self.mask = Some(pattern);
        let mask_fn = pattern.mask_function();
        let w = self.w as i16;
        for r in 0..w {
            for c in 0..w {
                if mask_fn(r, c) {
                    if let Module::Data(clr) = self.get(r, c) {
                        self.set(r, c, Module::Data(!clr))
                    }
                }
            }
        }
        let format_info = format_info_qr(self.ecl, pattern);
        self.draw_format_info(format_info);
    }
}


// Render
//------------------------------------------------------------------------------

impl QR {
    /// Black on white with a 4 module quiet zone.
    pub fn to_image(&self, module_sz: u32) -> GrayImage {
        rasterize(self, module_sz, QUIET_ZONE_MODULES, Luma([0]), Luma([255]))
    }

    /// Block character rendering for terminals with a dark background, where
    /// light modules are drawn filled.
    pub fn to_str(&self, module_sz: usize) -> String {
        let qz_sz = QUIET_ZONE_MODULES as usize * module_sz;
        let qr_sz = self.w * module_sz;
        let total_sz = qz_sz + qr_sz + qz_sz;

        let mut canvas = String::with_capacity(total_sz * (total_sz + 1) * 3);
        for i in 0..total_sz {
            for j in 0..total_sz {
                if i < qz_sz || i >= qz_sz + qr_sz || j < qz_sz || j >= qz_sz + qr_sz {
                    canvas.push('█');
                    continue;
                }
                let r = (i - qz_sz) / module_sz;
                let c = (j - qz_sz) / module_sz;
                canvas.push(self.module(r, c).select('█', ' '));
            }
            canvas.push('\n');
        }

        canvas
    }
}


// Global constants
//------------------------------------------------------------------------------

const QUIET_ZONE_MODULES: u32 = 4;

const FORMAT_INFO_BIT_LEN: usize = 15;

const VERSION_INFO_BIT_LEN: usize = 18;

static FORMAT_INFO_COORDS_QR_MAIN: [(i16, i16); 15] = [
    (8, 0),
    (8, 1),
    (8, 2),
    (8, 3),
    (8, 4),
    (8, 5),
    (8, 7),
    (8, 8),
    (7, 8),
    (5, 8),
    (4, 8),
    (3, 8),
    (2, 8),
    (1, 8),
    (0, 8),
];

static FORMAT_INFO_COORDS_QR_SIDE: [(i16, i16); 15] = [
    (-1, 8),
    (-2, 8),
    (-3, 8),
    (-4, 8),
    (-5, 8),
    (-6, 8),
    (-7, 8),
    (8, -8),
    (8, -7),
    (8, -6),
    (8, -5),
    (8, -4),
    (8, -3),
    (8, -2),
    (8, -1),
];

static VERSION_INFO_COORDS_TR: [(i16, i16); 18] = [
    (5, -9),
    (5, -10),
    (5, -11),
    (4, -9),
    (4, -10),
    (4, -11),
    (3, -9),
    (3, -10),
    (3, -11),
    (2, -9),
    (2, -10),
    (2, -11),
    (1, -9),
    (1, -10),
    (1, -11),
    (0, -9),
    (0, -10),
    (0, -11),
];

static VERSION_INFO_COORDS_BL: [(i16, i16); 18] = [
    (-9, 5),
    (-10, 5),
    (-11, 5),
    (-9, 4),
    (-10, 4),
    (-11, 4),
    (-9, 3),
    (-10, 3),
    (-11, 3),
    (-9, 2),
    (-10, 2),
    (-11, 2),
    (-9, 1),
    (-10, 1),
    (-11, 1),
    (-9, 0),
    (-10, 0),
    (-11, 0),
];
