//! Codepage decoding for 8-bit BIFF strings
//!
//! Timetable workbooks are authored on Cyrillic Windows installations, so
//! compressed (8-bit) strings are almost always windows-1251. The CODEPAGE
//! record normally says so; when it is absent the caller's fallback applies.

use encoding_rs::Encoding;

/// Codepage assumed when a workbook carries no CODEPAGE record
pub const DEFAULT_CODEPAGE: u16 = 1251;

/// BIFF8 stores this value in CODEPAGE to mean "strings are UTF-16LE"
pub const CODEPAGE_UTF16: u16 = 1200;

/// Decode bytes using the specified Windows codepage
///
/// Returns `None` if the codepage is not supported.
///
/// # Examples
///
/// ```
/// use timetable::ole::codepage::decode_bytes;
///
/// // "Пн" in windows-1251
/// assert_eq!(decode_bytes(&[0xCF, 0xED], 1251), Some("Пн".to_string()));
/// assert_eq!(decode_bytes(b"abc", 4242), None);
/// ```
#[inline]
pub fn decode_bytes(bytes: &[u8], codepage: u16) -> Option<String> {
    let encoding = codepage_to_encoding(codepage)?;
    if bytes.is_empty() {
        return Some(String::new());
    }
    // encoding_rs guarantees valid UTF-8 output
    Some(encoding.decode_without_bom_handling(bytes).0.into_owned())
}

/// Map Windows codepage identifier to encoding_rs Encoding
///
/// Covers the codepages Excel writes into CODEPAGE for Cyrillic and Western
/// workbooks. 367 (US-ASCII) is what BIFF8 files written by some exporters
/// claim even when the strings are 1252.
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // DOS codepages
        866 => Some(encoding_rs::IBM866), // Cyrillic (DOS)

        // Windows codepages
        367 | 1252 => Some(encoding_rs::WINDOWS_1252), // Western European
        1250 => Some(encoding_rs::WINDOWS_1250),       // Central European
        1251 => Some(encoding_rs::WINDOWS_1251),       // Cyrillic
        1253 => Some(encoding_rs::WINDOWS_1253),       // Greek
        1254 => Some(encoding_rs::WINDOWS_1254),       // Turkish
        1257 => Some(encoding_rs::WINDOWS_1257),       // Baltic

        // Other Cyrillic
        20866 => Some(encoding_rs::KOI8_R),
        21866 => Some(encoding_rs::KOI8_U),
        28595 => Some(encoding_rs::ISO_8859_5),

        // Mac Roman; encoding_rs only ships the Cyrillic Mac variant beside it
        10000 => Some(encoding_rs::MACINTOSH),
        10007 => Some(encoding_rs::X_MAC_CYRILLIC),

        // Unicode
        CODEPAGE_UTF16 => Some(encoding_rs::UTF_16LE),
        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// Decode UTF-16 LE bytes to a String (lossy, odd trailing byte ignored)
#[inline]
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cyrillic() {
        // "КУРС" in windows-1251
        let bytes = [0xCA, 0xD3, 0xD0, 0xD1];
        assert_eq!(decode_bytes(&bytes, 1251), Some("КУРС".to_string()));
    }

    #[test]
    fn test_decode_unsupported_codepage() {
        assert_eq!(decode_bytes(b"Hello", 4242), None);
    }

    #[test]
    fn test_decode_utf16le_odd_length() {
        let bytes = b"H\x00i\x00\xFF";
        assert_eq!(decode_utf16le(bytes), "Hi");
    }
}
