//! 集成测试：PHC 编解码
//!
//! 测试 PHC 字符串的序列化、反序列化与各种边界输入。

use hashrs::error::{Error, FormatError};
use hashrs::phc::{self, PhcOptions, PhcParams};
use hashrs::{constant_time_compare, generate_random_bytes};

/// 随机 salt / hash 的序列化与反序列化
#[test]
fn test_serialize_deserialize_random_bytes() {
    for len in [1usize, 2, 3, 16, 23, 32, 64, 128] {
        let salt = generate_random_bytes(16).unwrap();
        let hash = generate_random_bytes(len).unwrap();

        let options = PhcOptions::new("argon2id")
            .with_version(19)
            .with_params(PhcParams::new().with("t", 3).with("m", 4096).with("p", 1));
        let encoded = phc::serialize(&salt, &hash, &options).unwrap();
        assert!(!encoded.ends_with('='));

        let node = phc::deserialize(&encoded).unwrap();
        assert_eq!(node.id, "argon2id");
        assert_eq!(node.version, Some(19));
        assert_eq!(node.params, options.params);
        assert_eq!(node.salt.as_deref(), Some(salt.as_slice()));
        assert_eq!(node.hash.as_deref(), Some(hash.as_slice()));
    }
}

/// 参数顺序在序列化时保留
#[test]
fn test_params_keep_canonical_order() {
    let options = PhcOptions::new("scrypt")
        .with_params(PhcParams::new().with("n", 16384).with("r", 8).with("p", 1));
    let encoded = phc::serialize(b"saltsalt", b"hash", &options).unwrap();
    assert!(encoded.starts_with("$scrypt$n=16384,r=8,p=1$"));

    let node = phc::deserialize(&encoded).unwrap();
    let keys: Vec<&str> = node.params.as_ref().unwrap().iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["n", "r", "p"]);
}

/// 省略 version 与 params 时对应段完全不出现
#[test]
fn test_optional_segments_are_omitted() {
    let encoded = phc::serialize(b"saltsalt", b"hash", &PhcOptions::new("fake")).unwrap();
    assert_eq!(encoded.matches('$').count(), 3);

    let node = phc::deserialize(&encoded).unwrap();
    assert_eq!(node.version, None);
    assert_eq!(node.params, None);
}

/// 结构性错误
#[test]
fn test_structural_errors() {
    assert_eq!(
        phc::deserialize("argon2id$v=19").unwrap_err(),
        Error::Format(FormatError::MissingLeadingDollar)
    );
    assert!(matches!(
        phc::deserialize("$argon2id$v=19$m=1$a$b$c").unwrap_err(),
        Error::Format(FormatError::TooManyFields { .. })
    ));
    assert!(matches!(
        phc::deserialize("$Argon2$v=19$m=1").unwrap_err(),
        Error::Format(FormatError::InvalidId(_))
    ));
    assert!(matches!(
        phc::deserialize("$argon2id$m=1,t=x").unwrap_err(),
        Error::Format(FormatError::InvalidParams(_))
    ));
}

/// 编码时拒绝非法名称
#[test]
fn test_serialize_rejects_invalid_names() {
    assert!(matches!(
        phc::serialize(b"s", b"h", &PhcOptions::new("bad$id")),
        Err(Error::Encoding(_))
    ));
    assert!(matches!(
        phc::serialize(
            b"s",
            b"h",
            &PhcOptions::new("ok").with_params(PhcParams::new().with("Bad", 1))
        ),
        Err(Error::Encoding(_))
    ));
}

/// 常量时间比较
#[test]
fn test_constant_time_compare() {
    let a = generate_random_bytes(32).unwrap();
    let mut b = a.clone();
    assert!(constant_time_compare(&a, &b));

    b[31] ^= 1;
    assert!(!constant_time_compare(&a, &b));
    assert!(!constant_time_compare(&a, &a[..31]));
    assert!(constant_time_compare(&[], &[]));
}
