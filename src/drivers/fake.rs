//! Fake 驱动
//!
//! 不生成任何哈希，校验时直接比较明文，用于测试。

use super::HashDriver;
use crate::error::Result;

/// 不做哈希的驱动
#[derive(Debug, Default, Clone, Copy)]
pub struct Fake;

impl Fake {
    pub fn new() -> Self {
        Self
    }
}

impl HashDriver for Fake {
    /// 总是返回 true
    fn is_valid_hash(&self, _value: &str) -> bool {
        true
    }

    /// 原样返回
    fn make(&self, value: &str) -> Result<String> {
        Ok(value.to_string())
    }

    fn verify(&self, hashed_value: &str, plain_value: &str) -> bool {
        hashed_value == plain_value
    }

    /// 总是返回 false
    fn needs_rehash(&self, _hashed_value: &str) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_returns_value() {
        assert_eq!(Fake.make("hello-world").unwrap(), "hello-world");
        assert_eq!(Fake.make("").unwrap(), "");
    }

    #[test]
    fn test_verify_is_equality() {
        let fake = Fake::new();
        assert!(fake.verify("secret", "secret"));
        assert!(!fake.verify("secret", "Secret"));
    }

    #[test]
    fn test_never_needs_rehash() {
        assert!(!Fake.needs_rehash("anything").unwrap());
        assert!(Fake.is_valid_hash("not a phc string"));
    }
}
