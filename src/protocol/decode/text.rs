//! Character data in narrow (UTF-8) and wide (UTF-16) form.
//!
//! Wide data is a sequence of native-order 16-bit code units; lengths the
//! driver reports for it are in bytes, so the code-unit count is half.

use crate::config::CharEncoding;
use crate::error::{Error, Result};
use crate::protocol::types::BindType;

/// Encode a string for the given encoding, without terminator.
pub fn encode_text(text: &str, encoding: CharEncoding) -> Vec<u8> {
    match encoding {
        CharEncoding::Narrow => text.as_bytes().to_vec(),
        CharEncoding::Wide => text.encode_utf16().flat_map(u16::to_ne_bytes).collect(),
    }
}

/// Encoding implied by a character bind type.
pub fn encoding_of(bind: BindType) -> CharEncoding {
    match bind {
        BindType::WChar => CharEncoding::Wide,
        _ => CharEncoding::Narrow,
    }
}

/// Decode character bytes of the given bind type. `bytes` must not include
/// the terminator.
pub fn decode_text(bytes: &[u8], bind: BindType) -> Result<String> {
    match encoding_of(bind) {
        CharEncoding::Narrow => String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::type_conversion(format!("invalid UTF-8 text: {}", e))),
        CharEncoding::Wide => {
            if bytes.len() % 2 != 0 {
                return Err(Error::type_conversion(format!(
                    "wide text has odd byte length {}",
                    bytes.len()
                )));
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units)
                .map_err(|e| Error::type_conversion(format!("invalid UTF-16 text: {}", e)))
        }
    }
}

/// Largest byte count that fits in `capacity` once a terminator is reserved,
/// rounded down to a whole code unit.
pub fn text_room(capacity: usize, bind: BindType) -> usize {
    let room = capacity.saturating_sub(bind.terminator_len());
    room - room % bind.unit_width()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_roundtrip_counts_code_units() {
        let bytes = encode_text("h\u{e9}llo \u{1F600}", CharEncoding::Wide);
        // the emoji takes a surrogate pair
        assert_eq!(bytes.len() / 2, 8);
        assert_eq!(decode_text(&bytes, BindType::WChar).unwrap(), "h\u{e9}llo \u{1F600}");
    }

    #[test]
    fn test_narrow_decode_rejects_invalid_utf8() {
        assert_eq!(decode_text(b"abc", BindType::Char).unwrap(), "abc");
        assert!(decode_text(&[0xff, 0xfe], BindType::Char).is_err());
        assert!(decode_text(&[0x41], BindType::WChar).is_err());
    }

    #[test]
    fn test_text_room() {
        assert_eq!(text_room(11, BindType::Char), 10);
        assert_eq!(text_room(11, BindType::WChar), 8);
        assert_eq!(text_room(1, BindType::Char), 0);
        assert_eq!(text_room(8, BindType::Binary), 8);
    }
}
