mod qr;

pub use qr::{Module, QR};

use tracing::debug;

use crate::common::{
    codec::{encode, encode_with_version},
    ec::{ecc, interleave},
    error::EncodingError,
    mask::{apply_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
};

/// Configures and builds a [`QR`]. Version and mask are chosen automatically
/// unless pinned.
///
/// ```
/// use qrcard::{ECLevel, QRBuilder};
///
/// let qr = QRBuilder::new(b"HELLO").ec_level(ECLevel::Q).build().unwrap();
/// assert_eq!(qr.width(), 21);
/// ```
#[derive(Debug, Clone)]
pub struct QRBuilder<'a> {
    data: &'a [u8],
    version: Option<usize>,
    ec_level: ECLevel,
    mask: Option<u8>,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, version: None, ec_level: ECLevel::M, mask: None }
    }

    pub fn data(&mut self, data: &'a [u8]) -> &mut Self {
        self.data = data;
        self
    }

    pub fn version(&mut self, version: usize) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn unset_version(&mut self) -> &mut Self {
        self.version = None;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn mask(&mut self, mask: u8) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn unset_mask(&mut self) -> &mut Self {
        self.mask = None;
        self
    }

    pub fn metadata(&self) -> String {
        let version = self.version.map_or("None".to_string(), |v| v.to_string());
        let mask = self.mask.map_or("None".to_string(), |m| m.to_string());
        format!("{{ Version: {version}, Ec level: {:?}, Mask: {mask} }}", self.ec_level)
    }
}


impl QRBuilder<'_> {
    pub fn build(&self) -> Result<QR, EncodingError> {
        debug!(data_len = self.data.len(), "Generating QR {}", self.metadata());

        let mask = self.mask.map(MaskPattern::try_from).transpose()?;

        let (encoded_data, version) = match self.version {
            Some(v) => {
                let v = Version::try_from(v)?;
                (encode_with_version(self.data, v, self.ec_level)?, v)
            }
            None => encode(self.data, self.ec_level)?,
        };
        debug!(version = *version, bits = encoded_data.len(), "Encoded data");

        let payload = Self::compute_payload(encoded_data.data(), version, self.ec_level);

        let mut qr = QR::new(version, self.ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(&payload);

        let mask = match mask {
            Some(m) => {
                qr.apply_mask(m);
                m
            }
            None => apply_best_mask(&mut qr),
        };

        debug!(
            version = *version,
            mask = *mask,
            dark_modules = qr.count_dark_modules(),
            total_modules = qr.width() * qr.width(),
            "QR generated"
        );

        Ok(qr)
    }

    // Data codewords interleaved across blocks, followed by the
    // interleaved error correction codewords
    fn compute_payload(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<u8> {
        let (data_blocks, ecc_blocks) = ecc(data, version, ec_level);
        let mut payload = interleave(&data_blocks);
        payload.extend(interleave(&ecc_blocks));
        debug_assert_eq!(payload.len(), version.total_codewords());
        payload
    }
}

#[cfg(test)]
mod builder_tests {
    use test_case::test_case;

    use super::QRBuilder;
    use crate::common::{
        error::EncodingError,
        metadata::{ECLevel, Version},
    };

    fn decode(qr: &super::QR) -> (usize, String) {
        let img = qr.to_image(4);
        let (w, h) = (img.width() as usize, img.height() as usize);
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
            img.get_pixel(x as u32, y as u32).0[0]
        });
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1);
        let (meta, content) = grids[0].decode().unwrap();
        (meta.version.0, content)
    }

    #[test]
    fn test_payload_layout() {
        let data = (0..62u8).collect::<Vec<_>>();
        let payload = QRBuilder::compute_payload(&data, Version::new(5), ECLevel::Q);
        assert_eq!(payload.len(), 134);
        // First column of the four blocks, then the extra codewords of group 2
        assert_eq!(&payload[..4], &[0, 15, 30, 46]);
        assert_eq!(&payload[60..62], &[45, 61]);
    }

    #[test_case("Hello, world!🌎".to_string(), 1, ECLevel::L)]
    #[test_case("TEST".to_string(), 1, ECLevel::M)]
    #[test_case("12345".to_string(), 1, ECLevel::Q)]
    #[test_case("OK".to_string(), 1, ECLevel::H)]
    #[test_case("B3@j🎮#Z%8v🍣K!🔑3zC^8📖&r💾F9*🔍b6🌼".repeat(3), 7, ECLevel::L)]
    #[test_case("A11111111111111".repeat(11), 7, ECLevel::M)]
    #[test_case("aAAAAAA1111111111111AAAAAAa".repeat(3), 7, ECLevel::Q)]
    #[test_case("1234567890".repeat(15), 7, ECLevel::H)]
    #[test_case("B3@j🎮#Z%8v🍣K!🔑3zC^8📖&r💾F9*🔍b6🌼".repeat(4), 10, ECLevel::L)]
    #[test_case("A11111111111111".repeat(20), 10, ECLevel::M)]
    #[test_case("1234567890".repeat(28), 10, ECLevel::H)]
    #[test_case("B3@j🎮#Z%8v🍣K!🔑3zC^8📖&r💾F9*🔍b6🌼".repeat(22), 27, ECLevel::L)]
    #[test_case("A111111111111111".repeat(100), 27, ECLevel::M)]
    #[test_case("1234567890".repeat(145), 27, ECLevel::H)]
    #[test_case("B3@j🎮#Z%8v🍣K!🔑3zC^8📖&r💾F9*🔍b6🌼".repeat(57), 40, ECLevel::L)]
    #[test_case("A111111111111111".repeat(97), 40, ECLevel::M)]
    #[test_case("1234567890".repeat(305), 40, ECLevel::H)]
    fn test_builder(data: String, version: usize, ec_level: ECLevel) {
        let qr = QRBuilder::new(data.as_bytes()).version(version).ec_level(ec_level).build().unwrap();
        assert_eq!(qr.version(), Version::new(version));
        assert_eq!(qr.width(), version * 4 + 17);

        let (decoded_version, content) = decode(&qr);
        assert_eq!(decoded_version, version);
        assert_eq!(content, data);
    }

    #[test]
    fn test_builder_pinned_mask() {
        for m in 0..8 {
            let qr = QRBuilder::new(b"pinned").mask(m).build().unwrap();
            assert_eq!(qr.mask().map(|p| *p), Some(m));
            assert_eq!(decode(&qr).1, "pinned");
        }
    }

    #[test]
    fn test_builder_data_overflow() {
        let data = "1234567890".repeat(306);
        let res = QRBuilder::new(data.as_bytes()).version(40).ec_level(ECLevel::H).build();
        assert_eq!(res.unwrap_err(), EncodingError::DataTooLong { bits: 10218, capacity: 10208 });
    }

    #[test]
    fn test_builder_invalid_settings() {
        let res = QRBuilder::new(b"x").version(41).build();
        assert_eq!(res.unwrap_err(), EncodingError::InvalidVersion(41));
        let res = QRBuilder::new(b"x").version(0).build();
        assert_eq!(res.unwrap_err(), EncodingError::InvalidVersion(0));
        let res = QRBuilder::new(b"x").mask(8).build();
        assert_eq!(res.unwrap_err(), EncodingError::InvalidMaskPattern(8));
    }
}
