//! 哈希驱动模块
//!
//! 每个驱动封装一种 KDF：应用配置默认值并校验、生成 salt、调用底层原语，
//! 并通过 [`crate::phc`] 生成 / 解析存储格式。
//!
//! ## 支持的驱动
//!
//! - **Argon** (推荐): `argon2d` / `argon2i` / `argon2id`（需启用 `argon2` feature）
//! - **Bcrypt**: 同时识别 PHC 格式与传统 MCF 格式（需启用 `bcrypt` feature）
//! - **Scrypt**: 需启用 `scrypt` feature
//! - **Fake**: 不做任何哈希，仅用于测试
//!
//! ## 示例
//!
#![cfg_attr(feature = "bcrypt", doc = "```rust")]
#![cfg_attr(not(feature = "bcrypt"), doc = "```rust,ignore")]
//! use hashrs::drivers::{Bcrypt, BcryptConfig, HashDriver};
//!
//! let bcrypt = Bcrypt::new(BcryptConfig { rounds: 4, ..Default::default() }).unwrap();
//! let hash = bcrypt.make("secret").unwrap();
//!
//! assert!(bcrypt.verify(&hash, "secret"));
//! assert!(!bcrypt.needs_rehash(&hash).unwrap());
//! ```

#[cfg(feature = "argon2")]
mod argon;
#[cfg(feature = "bcrypt")]
mod bcrypt;
mod fake;
#[cfg(feature = "scrypt")]
mod scrypt;

#[cfg(feature = "argon2")]
pub use self::argon::{Argon, ArgonConfig, ArgonVariant};
#[cfg(feature = "bcrypt")]
pub use self::bcrypt::{Bcrypt, BcryptConfig};
pub use self::fake::Fake;
#[cfg(feature = "scrypt")]
pub use self::scrypt::{Scrypt, ScryptConfig};

use crate::error::{Error, Result};
use crate::phc::PhcParams;

// 编译时检查：至少需要启用一个密码哈希算法
#[cfg(not(any(feature = "argon2", feature = "bcrypt", feature = "scrypt")))]
compile_error!(
    "At least one password hashing algorithm (argon2, bcrypt, or scrypt) must be enabled. Enable one of the password hashing features."
);

/// 所有哈希驱动都要实现的接口
///
/// `verify` 与 `is_valid_hash` 面向不可信输入，只返回布尔值；
/// `make` 与 `needs_rehash` 面向可信调用方，可以返回错误。
pub trait HashDriver: Send + Sync {
    /// 检查值是否是该驱动能识别的哈希（只检查格式与参数范围）
    fn is_valid_hash(&self, value: &str) -> bool;

    /// 哈希明文
    fn make(&self, value: &str) -> Result<String>;

    /// 使用哈希中携带的参数校验明文
    fn verify(&self, hashed_value: &str, plain_value: &str) -> bool;

    /// 判断哈希是否需要使用当前配置重新生成
    ///
    /// ```rust,ignore
    /// if driver.verify(&hash, plain) && driver.needs_rehash(&hash)? {
    ///     let new_hash = driver.make(plain)?;
    /// }
    /// ```
    fn needs_rehash(&self, hashed_value: &str) -> Result<bool>;
}

/// 从参数表中取出必需的整数参数
pub(crate) fn required_param(params: &PhcParams, key: &str) -> Result<u64> {
    params
        .get(key)
        .ok_or_else(|| Error::invalid_hash(format!("The \"{}\" option must be an integer", key)))
}

/// 取出必需且非空的字节字段（salt / hash）
pub(crate) fn required_bytes(field: Option<Vec<u8>>, name: &str) -> Result<Vec<u8>> {
    field
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| Error::invalid_hash(format!("No \"{}\" found in the phc string", name)))
}
