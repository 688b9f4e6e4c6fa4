use std::ops::{Deref, Not};

use super::codec::Mode;
use super::error::EncodingError;
use super::mask::MaskPattern;
use super::tables::{
    ALIGNMENT_PATTERN_POSITIONS, ECC_PER_BLOCK, EC_BLOCK_COUNT, FORMAT_INFOS_QR, REMAINDER_BITS,
    TOTAL_CODEWORDS, VERSION_INFOS,
};

// Color
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    pub fn select<T>(&self, light: T, dark: T) -> T {
        match self {
            Self::Light => light,
            Self::Dark => dark,
        }
    }
}

impl Not for Color {
    type Output = Self;
    fn not(self) -> Self::Output {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl From<bool> for Color {
    fn from(dark: bool) -> Self {
        if dark {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

// Version
//------------------------------------------------------------------------------

/// Symbol version, 1 to 40. Width grows by 4 modules per version from 21.
#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub struct Version(usize);

impl Deref for Version {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub const fn new(version: usize) -> Self {
        debug_assert!(1 <= version && version <= 40, "Invalid version");
        Self(version)
    }

    pub(crate) const fn is_valid(version: usize) -> bool {
        1 <= version && version <= 40
    }

    pub const fn width(self) -> usize {
        self.0 * 4 + 17
    }

    pub fn total_codewords(self) -> usize {
        TOTAL_CODEWORDS[self.0]
    }

    pub fn remainder_bits(self) -> usize {
        REMAINDER_BITS[self.0]
    }

    pub fn ecc_per_block(self, ecl: ECLevel) -> usize {
        ECC_PER_BLOCK[ecl as usize][self.0]
    }

    pub fn data_codewords(self, ecl: ECLevel) -> usize {
        let blocks = EC_BLOCK_COUNT[ecl as usize][self.0];
        self.total_codewords() - blocks * self.ecc_per_block(ecl)
    }

    pub fn data_bit_capacity(self, ecl: ECLevel) -> usize {
        self.data_codewords(ecl) << 3
    }

    // Returns (group 1 block size, group 1 count, group 2 block size, group 2 count).
    // Group 2 blocks hold one more data codeword than group 1 blocks.
    pub fn data_codewords_per_block(self, ecl: ECLevel) -> (usize, usize, usize, usize) {
        let blocks = EC_BLOCK_COUNT[ecl as usize][self.0];
        let data = self.data_codewords(ecl);
        let block1_size = data / blocks;
        let block2_count = data % blocks;
        let block1_count = blocks - block2_count;
        let block2_size = if block2_count > 0 { block1_size + 1 } else { 0 };
        (block1_size, block1_count, block2_size, block2_count)
    }

    pub fn alignment_pattern(self) -> &'static [i16] {
        ALIGNMENT_PATTERN_POSITIONS[self.0]
    }

    pub fn mode_bits(self) -> usize {
        4
    }

    pub fn char_cnt_bits(self, mode: Mode) -> usize {
        match self.0 {
            1..=9 => match mode {
                Mode::Numeric => 10,
                Mode::Alphanumeric => 9,
                Mode::Byte => 8,
            },
            10..=26 => match mode {
                Mode::Numeric => 12,
                Mode::Alphanumeric => 11,
                Mode::Byte => 16,
            },
            _ => match mode {
                Mode::Numeric => 14,
                Mode::Alphanumeric => 13,
                Mode::Byte => 16,
            },
        }
    }

    pub fn info(self) -> u32 {
        debug_assert!(self.0 >= 7, "Version info only exists from version 7");
        VERSION_INFOS[self.0 - 7]
    }
}

impl TryFrom<usize> for Version {
    type Error = EncodingError;
    fn try_from(version: usize) -> Result<Self, Self::Error> {
        if Self::is_valid(version) {
            Ok(Self(version))
        } else {
            Err(EncodingError::InvalidVersion(version))
        }
    }
}

#[cfg(test)]
mod version_tests {
    use test_case::test_case;

    use super::{ECLevel, Version};
    use crate::common::error::EncodingError;

    #[test]
    fn test_try_from() {
        assert_eq!(Version::try_from(40), Ok(Version::MAX));
        assert_eq!(Version::try_from(0), Err(EncodingError::InvalidVersion(0)));
        assert_eq!(Version::try_from(41), Err(EncodingError::InvalidVersion(41)));
    }

    #[test_case(1, 21)]
    #[test_case(7, 45)]
    #[test_case(40, 177)]
    fn test_width(v: usize, w: usize) {
        assert_eq!(Version::new(v).width(), w);
    }

    #[test_case(1, ECLevel::L, 19)]
    #[test_case(1, ECLevel::M, 16)]
    #[test_case(1, ECLevel::Q, 13)]
    #[test_case(1, ECLevel::H, 9)]
    #[test_case(5, ECLevel::Q, 62)]
    #[test_case(10, ECLevel::M, 216)]
    #[test_case(40, ECLevel::L, 2956)]
    #[test_case(40, ECLevel::H, 1276)]
    fn test_data_codewords(v: usize, ecl: ECLevel, exp: usize) {
        assert_eq!(Version::new(v).data_codewords(ecl), exp);
    }

    #[test]
    fn test_data_codewords_per_block() {
        assert_eq!(Version::new(1).data_codewords_per_block(ECLevel::M), (16, 1, 0, 0));
        assert_eq!(Version::new(5).data_codewords_per_block(ECLevel::Q), (15, 2, 16, 2));
        assert_eq!(Version::new(40).data_codewords_per_block(ECLevel::L), (118, 19, 119, 6));
    }

    #[test]
    fn test_blocks_fill_total_codewords() {
        for v in 1..=40 {
            let ver = Version::new(v);
            for ecl in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
                let (s1, c1, s2, c2) = ver.data_codewords_per_block(ecl);
                let ecc = (c1 + c2) * ver.ecc_per_block(ecl);
                assert_eq!(s1 * c1 + s2 * c2 + ecc, ver.total_codewords(), "{ver:?} {ecl:?}");
            }
        }
    }

    #[test]
    fn test_version_info() {
        assert_eq!(Version::new(7).info(), 0x07C94);
        assert_eq!(Version::new(40).info(), 0x28C69);
        for v in 7..=40 {
            assert_eq!(Version::new(v).info() >> 12, v as u32);
        }
    }
}

// Error correction level
//------------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub enum ECLevel {
    L = 0,
    #[default]
    M = 1,
    Q = 2,
    H = 3,
}

impl ECLevel {
    // Two-bit indicator stored in format info
    pub fn format_bits(self) -> u32 {
        (self as u32) ^ 1
    }
}

// Format info
//------------------------------------------------------------------------------

pub fn format_info_qr(ecl: ECLevel, mask: MaskPattern) -> u32 {
    let format_data = (ecl.format_bits() << 3) | *mask as u32;
    FORMAT_INFOS_QR[format_data as usize]
}
