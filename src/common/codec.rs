pub use encode::*;

// Mode
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Mode {
    Numeric = 0b0001,
    Alphanumeric = 0b0010,
    Byte = 0b0100,
}

pub static MODES: [Mode; 3] = [Mode::Numeric, Mode::Alphanumeric, Mode::Byte];

pub static PADDING_CODEWORDS: [u8; 2] = [0b11101100, 0b00010001];

impl Mode {
    #[inline]
    fn numeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Numeric.contains(char), "Invalid numeric data: {char}");
        (char - b'0') as u16
    }

    #[inline]
    fn alphanumeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Alphanumeric.contains(char), "Invalid alphanumeric data: {char}");
        match char {
            b'0'..=b'9' => (char - b'0') as u16,
            b'A'..=b'Z' => (char - b'A' + 10) as u16,
            b' ' => 36,
            b'$' => 37,
            b'%' => 38,
            b'*' => 39,
            b'+' => 40,
            b'-' => 41,
            b'.' => 42,
            b'/' => 43,
            b':' => 44,
            _ => 0,
        }
    }

    pub fn encode_chunk(&self, data: &[u8]) -> u16 {
        let len = data.len();
        match self {
            Self::Numeric => {
                debug_assert!(len <= 3, "Data is too long for numeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 10 + Self::numeric_digit(*b))
            }
            Self::Alphanumeric => {
                debug_assert!(len <= 2, "Data is too long for alphanumeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 45 + Self::alphanumeric_digit(*b))
            }
            Self::Byte => {
                debug_assert!(len == 1, "Data is too long for byte conversion: {len}");
                data[0] as u16
            }
        }
    }

    pub fn contains(&self, byte: u8) -> bool {
        match self {
            Self::Numeric => byte.is_ascii_digit(),
            Self::Alphanumeric => {
                matches!(byte, b'0'..=b'9' | b'A'..=b'Z' | b' ' | b'$' | b'%' | b'*' | b'+' | b'-' | b'.' | b'/' | b':')
            }
            Self::Byte => true,
        }
    }

    // Bit length of `len` characters encoded in this mode, header excluded
    pub fn encoded_len(&self, len: usize) -> usize {
        match *self {
            Self::Numeric => (len * 10 + 2) / 3,
            Self::Alphanumeric => (len * 11 + 1) / 2,
            Self::Byte => len * 8,
        }
    }
}


// Segment
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Segment<'a> {
    pub mode: Mode,
    pub mode_bits: usize,
    pub len_bits: usize,
    pub data: &'a [u8],
}

impl<'a> Segment<'a> {
    pub fn new(mode: Mode, mode_bits: usize, len_bits: usize, data: &'a [u8]) -> Self {
        Self { mode, mode_bits, len_bits, data }
    }

    pub fn bit_len(&self) -> usize {
        self.mode_bits + self.len_bits + self.mode.encoded_len(self.data.len())
    }
}

// Encoder
//------------------------------------------------------------------------------

pub mod encode {
    use std::mem::swap;

    use tracing::debug;

    use super::writer::{pad_remaining_capacity, push_segment, push_terminator};
    use super::{Mode, Segment, MODES};
    use crate::common::{
        bitstream::BitStream,
        error::EncodingError,
        metadata::{ECLevel, Version},
    };

    /// Encodes data into the smallest version that holds it. Returns the padded
    /// data codewords together with the chosen version.
    pub fn encode(data: &[u8], ecl: ECLevel) -> Result<(BitStream, Version), EncodingError> {
        let (ver, segs) = find_optimal_version_and_segments(data, ecl)?;
        debug!(version = *ver, segments = segs.len(), "Selected version");
        Ok((write_segments(&segs, ver, ecl), ver))
    }

    /// Encodes data into the given version, failing if it does not fit.
    pub fn encode_with_version(
        data: &[u8],
        ver: Version,
        ecl: ECLevel,
    ) -> Result<BitStream, EncodingError> {
        let capacity = ver.data_bit_capacity(ecl);
        let segs = compute_optimal_segments(data, ver);
        let bits = total_bit_len(&segs);
        if bits > capacity {
            return Err(EncodingError::DataTooLong { bits, capacity });
        }
        Ok(write_segments(&segs, ver, ecl))
    }

    fn write_segments(segs: &[Segment], ver: Version, ecl: ECLevel) -> BitStream {
        let mut bs = BitStream::new(ver.data_bit_capacity(ecl));
        for seg in segs {
            push_segment(seg, &mut bs);
        }
        push_terminator(&mut bs);
        pad_remaining_capacity(&mut bs);
        bs
    }

    fn total_bit_len(segs: &[Segment]) -> usize {
        segs.iter().map(|s| s.bit_len()).sum()
    }

    // Segments only depend on the character count bit widths, which change at
    // versions 10 and 27, so they are recomputed at the start of each class
    fn find_optimal_version_and_segments(
        data: &[u8],
        ecl: ECLevel,
    ) -> Result<(Version, Vec<Segment<'_>>), EncodingError> {
        let mut segs = vec![];
        let mut sz = 0;
        for v in 1..=40 {
            let ver = Version::new(v);
            if v == 1 || v == 10 || v == 27 {
                segs = compute_optimal_segments(data, ver);
                sz = total_bit_len(&segs);
            }
            if sz <= ver.data_bit_capacity(ecl) {
                return Ok((ver, segs));
            }
        }
        Err(EncodingError::DataTooLong { bits: sz, capacity: Version::MAX.data_bit_capacity(ecl) })
    }

    // Dynamic programming to compute optimum mode segments. Costs are in
    // sixths of a bit so that numeric (10/3) and alphanumeric (11/2) per-char
    // costs are integral.
    pub(crate) fn compute_optimal_segments(data: &[u8], ver: Version) -> Vec<Segment<'_>> {
        if data.is_empty() {
            let len_bits = ver.char_cnt_bits(Mode::Byte);
            return vec![Segment::new(Mode::Byte, ver.mode_bits(), len_bits, data)];
        }

        let len = data.len();
        let header_cost = |m: Mode| (ver.mode_bits() + ver.char_cnt_bits(m)) * 6;
        let mut prev_cost = [0usize; 3];
        MODES.iter().enumerate().for_each(|(i, &m)| prev_cost[i] = header_cost(m));
        let mut cur_cost = [usize::MAX; 3];
        let mut min_path = vec![[usize::MAX; 3]; len];
        for (i, b) in data.iter().enumerate() {
            for (j, to_mode) in MODES.iter().enumerate() {
                if !to_mode.contains(*b) {
                    continue;
                }
                let encoded_char_size = match to_mode {
                    Mode::Numeric => 20,
                    Mode::Alphanumeric => 33,
                    Mode::Byte => 48,
                };
                for (k, from_mode) in MODES.iter().enumerate() {
                    if prev_cost[k] == usize::MAX {
                        continue;
                    }
                    let mut cost = if to_mode != from_mode {
                        prev_cost[k].div_ceil(6) * 6 + header_cost(*to_mode)
                    } else {
                        prev_cost[k]
                    };
                    cost += encoded_char_size;
                    if cost < cur_cost[j] {
                        cur_cost[j] = cost;
                        min_path[i][j] = k;
                    }
                }
            }
            swap(&mut prev_cost, &mut cur_cost);
            cur_cost.fill(usize::MAX);
        }

        let char_modes = trace_optimal_modes(&min_path, prev_cost);
        build_segments(ver, &char_modes, data)
    }

    // Backtrack min_path from the cheapest final mode to recover each char's mode
    fn trace_optimal_modes(min_path: &[[usize; 3]], final_cost: [usize; 3]) -> Vec<Mode> {
        let mut mode_index = 0;
        for i in 1..3 {
            if final_cost[i] < final_cost[mode_index] {
                mode_index = i;
            }
        }
        let mut modes = Vec::with_capacity(min_path.len());
        for step in min_path.iter().rev() {
            modes.push(MODES[mode_index]);
            mode_index = step[mode_index];
        }
        modes.reverse();
        modes
    }

    // Group consecutive chars sharing a mode into segments
    fn build_segments<'a>(ver: Version, char_modes: &[Mode], data: &'a [u8]) -> Vec<Segment<'a>> {
        let mode_bits = ver.mode_bits();
        let mut segs: Vec<Segment> = vec![];
        let mut seg_start = 0;
        let mut seg_mode = char_modes[0];
        for (i, &m) in char_modes.iter().enumerate().skip(1) {
            if seg_mode != m {
                let len_bits = ver.char_cnt_bits(seg_mode);
                segs.push(Segment::new(seg_mode, mode_bits, len_bits, &data[seg_start..i]));
                seg_mode = m;
                seg_start = i;
            }
        }
        let len_bits = ver.char_cnt_bits(seg_mode);
        segs.push(Segment::new(seg_mode, mode_bits, len_bits, &data[seg_start..]));

        segs
    }

    #[cfg(test)]
    mod encode_tests {
        use test_case::test_case;

        use super::{
            build_segments, compute_optimal_segments, encode, encode_with_version,
            find_optimal_version_and_segments, ECLevel, EncodingError, Mode, Segment, Version,
        };

        #[test]
        fn test_build_segments() {
            let data = "aaaaa11111AAA";
            let ver = Version::new(1);
            let mode_bits = ver.mode_bits();
            let mut char_modes = vec![Mode::Alphanumeric; 5];
            char_modes.extend([Mode::Numeric; 5]);
            char_modes.extend([Mode::Byte; 3]);
            let segs = build_segments(ver, &char_modes, data.as_bytes());
            let seg_1 = Segment::new(
                Mode::Alphanumeric,
                mode_bits,
                ver.char_cnt_bits(Mode::Alphanumeric),
                data[0..5].as_bytes(),
            );
            let seg_2 = Segment::new(
                Mode::Numeric,
                mode_bits,
                ver.char_cnt_bits(Mode::Numeric),
                data[5..10].as_bytes(),
            );
            let seg_3 = Segment::new(
                Mode::Byte,
                mode_bits,
                ver.char_cnt_bits(Mode::Byte),
                data[10..].as_bytes(),
            );
            assert_eq!(segs, vec![seg_1, seg_2, seg_3]);
        }

        #[test_case("1111111", 1, vec![(Mode::Numeric, 0, None)])]
        #[test_case("AAAAA", 1, vec![(Mode::Alphanumeric, 0, None)])]
        #[test_case("aaaaa", 1, vec![(Mode::Byte, 0, None)])]
        #[test_case("1111111AAAA", 1, vec![(Mode::Numeric, 0, Some(7)), (Mode::Alphanumeric, 7, None)])]
        #[test_case("111111AAAA", 1, vec![(Mode::Alphanumeric, 0, None)])]
        #[test_case("aaa11111a", 1, vec![(Mode::Byte, 0, None)])]
        #[test_case("aaa111111a", 1, vec![(Mode::Byte, 0, Some(3)), (Mode::Numeric, 3, Some(9)), (Mode::Byte, 9, None)])]
        #[test_case("aaa1111A", 1, vec![(Mode::Byte, 0, None)])]
        #[test_case("aaa1111111AA", 1, vec![(Mode::Byte, 0, Some(3)), (Mode::Numeric, 3, Some(10)), (Mode::Alphanumeric, 10, None)])]
        fn test_compute_optimal_segments(
            data: &str,
            ver: usize,
            chunks: Vec<(Mode, usize, Option<usize>)>,
        ) {
            let ver = Version::new(ver);
            let mode_bits = ver.mode_bits();
            let segs = compute_optimal_segments(data.as_bytes(), ver);
            assert_eq!(segs.len(), chunks.len());
            for (seg, &(mode, start, end)) in segs.iter().zip(chunks.iter()) {
                let len_bits = ver.char_cnt_bits(mode);
                let exp_seg = match end {
                    Some(e) => Segment::new(mode, mode_bits, len_bits, data[start..e].as_bytes()),
                    None => Segment::new(mode, mode_bits, len_bits, data[start..].as_bytes()),
                };
                assert_eq!(*seg, exp_seg);
            }
        }

        #[test]
        fn test_compute_optimal_segments_empty() {
            let ver = Version::new(1);
            let segs = compute_optimal_segments(b"", ver);
            assert_eq!(segs, vec![Segment::new(Mode::Byte, 4, 8, b"")]);
            assert_eq!(segs[0].bit_len(), 12);
        }

        #[test]
        fn test_optimal_segments_never_longer_than_single_byte_segment() {
            let data = "Golden ratio φ = 1.6180339887498948482045868343656381177203091798057628621354486227052604628189024497072072041893911374......";
            let ver = Version::new(9);
            let segs = compute_optimal_segments(data.as_bytes(), ver);
            let bits: usize = segs.iter().map(|s| s.bit_len()).sum();
            let single = Segment::new(Mode::Byte, 4, ver.char_cnt_bits(Mode::Byte), data.as_bytes());
            assert!(bits < single.bit_len());
            assert!(segs.iter().any(|s| s.mode == Mode::Numeric));
            let joined: Vec<u8> = segs.iter().flat_map(|s| s.data.iter().copied()).collect();
            assert_eq!(joined, data.as_bytes());
        }

        #[test_case("aaaaa11111AAA", 1, ECLevel::L)]
        #[test_case("A11111111111111A11111111111111", 2, ECLevel::L)]
        #[test_case("HELLO", 1, ECLevel::M)]
        #[test_case("abcdefghijklmn", 1, ECLevel::M)]
        #[test_case("abcdefghijklmno", 2, ECLevel::M)]
        #[test_case("", 1, ECLevel::H)]
        fn test_find_optimal_ver_and_segments(data: &str, exp_ver: usize, ecl: ECLevel) {
            let (ver, _) = find_optimal_version_and_segments(data.as_bytes(), ecl).unwrap();
            assert_eq!(ver, Version::new(exp_ver));
        }

        #[test]
        fn test_find_optimal_ver_max_capacity() {
            let data = "a".repeat(2953);
            let (ver, _) = find_optimal_version_and_segments(data.as_bytes(), ECLevel::L).unwrap();
            assert_eq!(ver, Version::MAX);
        }

        #[test]
        fn test_find_optimal_ver_overflow() {
            let data = "a".repeat(2954);
            let res = find_optimal_version_and_segments(data.as_bytes(), ECLevel::L);
            assert_eq!(res.unwrap_err(), EncodingError::DataTooLong { bits: 23652, capacity: 23648 });
        }

        #[test]
        fn test_encode_fills_capacity() {
            let (bs, ver) = encode(b"HELLO", ECLevel::M).unwrap();
            assert_eq!(ver, Version::new(1));
            assert_eq!(bs.len(), ver.data_bit_capacity(ECLevel::M));
            // 0010 000000101 then "HE" "LL" "O"
            assert_eq!(&bs.data()[..2], &[0b00100000, 0b00101011]);
        }

        #[test]
        fn test_encode_with_version_too_small() {
            let data = "a".repeat(20);
            let res = encode_with_version(data.as_bytes(), Version::new(1), ECLevel::H);
            assert!(matches!(res, Err(EncodingError::DataTooLong { .. })));
            let res = encode_with_version(data.as_bytes(), Version::new(3), ECLevel::H);
            assert!(res.is_ok());
        }
    }
}

// Writer for encoded data
//------------------------------------------------------------------------------

pub(super) mod writer {
    use super::{Mode, Segment, PADDING_CODEWORDS};
    use crate::common::bitstream::BitStream;

    pub fn push_segment(seg: &Segment, out: &mut BitStream) {
        push_header(seg, out);
        match seg.mode {
            Mode::Numeric => push_numeric_data(seg.data, out),
            Mode::Alphanumeric => push_alphanumeric_data(seg.data, out),
            Mode::Byte => push_byte_data(seg.data, out),
        }
    }

    fn push_header(seg: &Segment, out: &mut BitStream) {
        out.push_bits(seg.mode as u8, seg.mode_bits);
        let char_cnt = seg.data.len();
        debug_assert!(
            char_cnt < (1 << seg.len_bits),
            "Char count exceeds bit length: Char count {char_cnt}, Char count bits {}",
            seg.len_bits
        );
        out.push_bits(char_cnt as u16, seg.len_bits);
    }

    fn push_numeric_data(data: &[u8], out: &mut BitStream) {
        for chunk in data.chunks(3) {
            let len = Mode::Numeric.encoded_len(chunk.len());
            let data = Mode::Numeric.encode_chunk(chunk);
            out.push_bits(data, len);
        }
    }

    fn push_alphanumeric_data(data: &[u8], out: &mut BitStream) {
        for chunk in data.chunks(2) {
            let len = Mode::Alphanumeric.encoded_len(chunk.len());
            let data = Mode::Alphanumeric.encode_chunk(chunk);
            out.push_bits(data, len);
        }
    }

    fn push_byte_data(data: &[u8], out: &mut BitStream) {
        for &byte in data {
            out.push_bits(byte, 8);
        }
    }

    pub fn push_terminator(out: &mut BitStream) {
        let bit_len = out.len();
        let bit_capacity = out.capacity();
        if bit_len < bit_capacity {
            let term_len = std::cmp::min(4, bit_capacity - bit_len);
            out.push_bits(0u8, term_len);
        }
    }

    pub fn pad_remaining_capacity(out: &mut BitStream) {
        push_padding_bits(out);
        push_padding_codewords(out);
    }

    fn push_padding_bits(out: &mut BitStream) {
        let offset = out.len() & 7;
        if offset > 0 {
            out.push_bits(0u8, 8 - offset);
        }
    }

    fn push_padding_codewords(out: &mut BitStream) {
        debug_assert!(
            out.len() & 7 == 0,
            "Bit offset should be zero before padding codewords: {}",
            out.len() & 7
        );

        let remain_byte_capacity = (out.capacity() - out.len()) >> 3;
        PADDING_CODEWORDS.iter().copied().cycle().take(remain_byte_capacity).for_each(|pc| {
            out.push_bits(pc, 8);
        });
    }

}
