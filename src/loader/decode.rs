//! Byte decoding with encoding fallback.

use encoding_rs::{Encoding, GB18030, GBK};

/// Decoded text plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// Name of the encoding that produced `text`
    pub encoding: &'static str,
    /// True when no encoding fit and invalid bytes were replaced with U+FFFD
    pub lossy: bool,
}

impl Decoded {
    /// Whether the text carries replacement characters, from lossy decoding or
    /// from the source itself
    pub fn has_replacement_characters(&self) -> bool {
        self.lossy || self.text.contains(char::REPLACEMENT_CHARACTER)
    }
}

/// Decode raw file bytes: strict UTF-8, then GB18030, then GBK, and finally
/// UTF-8 with replacement characters. A leading UTF-8 byte order mark is
/// dropped.
pub fn decode_bytes(raw: &[u8]) -> Decoded {
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);
    if let Ok(text) = std::str::from_utf8(raw) {
        return Decoded {
            text: text.to_string(),
            encoding: "UTF-8",
            lossy: false,
        };
    }

    let fallbacks: [&'static Encoding; 2] = [GB18030, GBK];
    for encoding in fallbacks {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(raw) {
            log::debug!("decoded input as {}", encoding.name());
            return Decoded {
                text: text.into_owned(),
                encoding: encoding.name(),
                lossy: false,
            };
        }
    }

    log::warn!("input is not valid in any supported encoding, decoding lossily");
    Decoded {
        text: String::from_utf8_lossy(raw).into_owned(),
        encoding: "UTF-8",
        lossy: true,
    }
}
