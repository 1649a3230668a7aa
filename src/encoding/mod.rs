//! Encoding helpers
//!
//! Base64 for the credential headers. Input is treated as Latin-1: every
//! character maps to exactly one byte, so characters above U+00FF are rejected
//! instead of being silently widened to multi-byte UTF-8.
//!
//! # Example
//!
//! ```
//! use upyun_relay::encoding::base64_encode;
//!
//! assert_eq!(base64_encode("operator:password").unwrap(), "b3BlcmF0b3I6cGFzc3dvcmQ=");
//! assert!(base64_encode("密码").is_err());
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Encoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    // the character itself is left out of the message: inputs are credentials
    #[error("Character at index {index} is out of range 0-255")]
    CharOutOfRange { ch: char, index: usize },
}

/// Convert a string to its Latin-1 bytes.
///
/// Fails on the first character whose code point exceeds 0xFF.
pub fn latin1_bytes(input: &str) -> Result<Vec<u8>, EncodeError> {
    input
        .chars()
        .enumerate()
        .map(|(index, ch)| {
            u8::try_from(u32::from(ch)).map_err(|_| EncodeError::CharOutOfRange { ch, index })
        })
        .collect()
}

/// Base64-encode a Latin-1 string with the standard alphabet and `=` padding.
pub fn base64_encode(input: &str) -> Result<String, EncodeError> {
    let bytes = latin1_bytes(input)?;
    Ok(STANDARD.encode(bytes))
}

/// Build an HTTP Basic `Authorization` value for `user:password`.
pub fn basic_auth(user: &str, password: &str) -> Result<String, EncodeError> {
    Ok(format!("Basic {}", base64_encode(&format!("{}:{}", user, password))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_variants() {
        assert_eq!(base64_encode("").unwrap(), "");
        assert_eq!(base64_encode("f").unwrap(), "Zg==");
        assert_eq!(base64_encode("fo").unwrap(), "Zm8=");
        assert_eq!(base64_encode("foo").unwrap(), "Zm9v");
        assert_eq!(base64_encode("foobar").unwrap(), "Zm9vYmFy");
    }

    #[test]
    fn test_latin1_high_bytes() {
        // U+00FF is the last accepted character and must encode as a single byte
        let encoded = base64_encode("\u{ff}\u{80}").unwrap();
        assert_eq!(STANDARD.decode(&encoded).unwrap(), vec![0xff, 0x80]);
    }

    #[test]
    fn test_out_of_range_reports_position() {
        let err = base64_encode("ab\u{100}c").unwrap_err();
        assert_eq!(
            err,
            EncodeError::CharOutOfRange {
                ch: '\u{100}',
                index: 2
            }
        );
    }

    #[test]
    fn test_decodes_to_original_bytes() {
        let samples = ["a", "ab", "abc", "abcd", "secret-code", "p@ss:w0rd/+=", "\u{e9}t\u{e9}"];
        for sample in samples {
            let encoded = base64_encode(sample).unwrap();
            assert_eq!(encoded.len(), sample.chars().count().div_ceil(3) * 4);
            assert_eq!(STANDARD.decode(&encoded).unwrap(), latin1_bytes(sample).unwrap());
        }
    }

    #[test]
    fn test_basic_auth() {
        assert_eq!(
            basic_auth("operator", "password").unwrap(),
            "Basic b3BlcmF0b3I6cGFzc3dvcmQ="
        );
    }
}
