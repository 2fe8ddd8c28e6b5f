//! 配置校验函数
//!
//! 拒绝越界或不在枚举范围内的配置值。配置永远不会被静默修正。

use std::fmt::Display;

use crate::error::ConfigError;

/// 2^32 - 1
pub const MAX_UINT32: u64 = (1 << 32) - 1;

/// 2^24 - 1
pub const MAX_UINT24: u64 = (1 << 24) - 1;

/// 校验数值位于闭区间 `[min, max]` 内
///
/// ```rust
/// use hashrs::validators::validate_range;
///
/// assert!(validate_range("rounds", 10, 4, 31).is_ok());
/// assert!(validate_range("rounds", 3, 4, 31).is_err());
/// ```
pub fn validate_range(label: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            label: label.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// 校验值属于允许的取值集合
pub fn validate_enum<T>(label: &str, value: &T, allowed: &[T]) -> Result<(), ConfigError>
where
    T: PartialEq + Display,
{
    if allowed.contains(value) {
        return Ok(());
    }
    Err(ConfigError::NotAllowed {
        label: label.to_string(),
        allowed: allowed.iter().map(ToString::to_string).collect(),
    })
}
