//! bcrypt 专用 base64 编解码
//!
//! bcrypt 使用自己的字母表 `./A-Za-z0-9`，顺序与 RFC 4648 不同，也没有填充，
//! 不能与标准 base64 混用。

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use crate::error::{FormatError, Result};

/// bcrypt 字母表，编码时不带填充，解码时容忍尾部多余比特
const BCRYPT_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// 使用 bcrypt 字母表编码
///
/// ```rust
/// use hashrs::bcrypt_base64;
///
/// assert_eq!(bcrypt_base64::encode(&[0u8; 16]).len(), 22);
/// ```
pub fn encode(input: &[u8]) -> String {
    BCRYPT_B64.encode(input)
}

/// 使用 bcrypt 字母表解码
///
/// # Errors
///
/// 输入包含字母表以外的字符或长度非法时返回 [`FormatError::InvalidBase64`]
pub fn decode(input: &str) -> Result<Vec<u8>> {
    BCRYPT_B64
        .decode(input)
        .map_err(|_| FormatError::InvalidBase64("bcrypt digest").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_encode_known_salt() {
        // 16 个零字节在 bcrypt 中编码为 22 个 '.'
        assert_eq!(encode(&[0u8; 16]), "......................");
        assert_eq!(encode(&[0xff, 0xff, 0xff]), "9999");
    }

    #[test]
    fn test_differs_from_standard_alphabet() {
        // 标准 base64 下为 "ABCD"
        assert_eq!(encode(&[0x00, 0x10, 0x83]), "./AB");
    }

    #[test]
    fn test_decode_bcrypt_digest_length() {
        // bcrypt 摘要部分是 31 个字符，对应 23 字节
        let digest = "0T4Cf8htpt/8FbjK.cErdaTh8T6ClYQ";
        assert_eq!(digest.len(), 31);
        assert_eq!(decode(digest).unwrap().len(), 23);
    }

    #[test]
    fn test_decode_reverses_encode() {
        let input: Vec<u8> = (0u8..=40).collect();
        assert_eq!(decode(&encode(&input)).unwrap(), input);
    }

    #[test]
    fn test_decode_rejects_invalid_char() {
        assert_eq!(
            decode("99!!").unwrap_err(),
            Error::Format(FormatError::InvalidBase64("bcrypt digest"))
        );
        assert!(decode("ab+/").is_err());
    }
}
