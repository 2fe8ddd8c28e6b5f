//! 安全随机数与常量时间比较模块
//!
//! - 使用操作系统 CSPRNG 生成 salt
//! - 使用常量时间比较校验摘要，防止时序攻击

use rand::{TryRngCore, rngs::OsRng};
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, Error, Result};

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Example
///
/// ```rust
/// use hashrs::random::generate_random_bytes;
///
/// let salt = generate_random_bytes(16).unwrap();
/// assert_eq!(salt.len(), 16);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;
    Ok(bytes)
}

/// 常量时间比较两个字节切片
///
/// 比较耗时与第一个不同字节的位置无关。长度不同时直接返回 `false`，
/// 只泄露长度（摘要长度本身是公开的）。
///
/// # Example
///
/// ```rust
/// use hashrs::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"digest", b"digest"));
/// assert!(!constant_time_compare(b"digest", b"digesT"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
