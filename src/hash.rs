//! Hash 门面
//!
//! [`Hash`] 包装一个驱动实例，原样转发 `make` / `verify` / `needs_rehash` /
//! `is_valid_hash`，并额外提供测试中常用的断言方法。

use std::fmt;
use std::sync::Arc;

use crate::drivers::HashDriver;
use crate::error::{Error, Result};

/// 包装单个驱动的哈希门面
///
/// 克隆开销很小，克隆后共享同一个驱动实例。
///
/// # Example
///
/// ```rust
/// use hashrs::Hash;
/// use hashrs::drivers::Fake;
///
/// let hash = Hash::new(Fake);
/// let hashed = hash.make("secret").unwrap();
///
/// assert!(hash.verify(&hashed, "secret"));
/// hash.assert_equals(&hashed, "secret").unwrap();
/// hash.assert_not_equals(&hashed, "other").unwrap();
/// ```
#[derive(Clone)]
pub struct Hash {
    driver: Arc<dyn HashDriver>,
}

impl Hash {
    /// 使用驱动创建门面
    pub fn new<D: HashDriver + 'static>(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    /// 使用共享的驱动创建门面
    pub fn from_arc(driver: Arc<dyn HashDriver>) -> Self {
        Self { driver }
    }

    /// 两个门面是否包装同一个驱动实例
    pub fn ptr_eq(&self, other: &Hash) -> bool {
        Arc::ptr_eq(&self.driver, &other.driver)
    }

    /// 检查值是否是合法的哈希（只检查格式）
    pub fn is_valid_hash(&self, value: &str) -> bool {
        self.driver.is_valid_hash(value)
    }

    /// 哈希明文
    pub fn make(&self, value: &str) -> Result<String> {
        self.driver.make(value)
    }

    /// 校验明文，任何解析或计算错误都返回 `false`
    pub fn verify(&self, hashed_value: &str, plain_value: &str) -> bool {
        self.driver.verify(hashed_value, plain_value)
    }

    /// 判断哈希是否需要重新生成
    pub fn needs_rehash(&self, hashed_value: &str) -> Result<bool> {
        self.driver.needs_rehash(hashed_value)
    }

    /// 断言明文能通过校验
    pub fn assert_equals(&self, hashed_value: &str, plain_value: &str) -> Result<()> {
        if !self.verify(hashed_value, plain_value) {
            return Err(Error::Assertion(format!(
                "Expected \"{}\" to pass hash verification",
                plain_value
            )));
        }
        Ok(())
    }

    /// 断言明文不能通过校验
    pub fn assert_not_equals(&self, hashed_value: &str, plain_value: &str) -> Result<()> {
        if self.verify(hashed_value, plain_value) {
            return Err(Error::Assertion(format!(
                "Expected \"{}\" to fail hash verification",
                plain_value
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hash").finish_non_exhaustive()
    }
}
