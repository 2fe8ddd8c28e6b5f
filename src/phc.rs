//! PHC 字符串编解码
//!
//! 实现 Password Hashing Competition 定义的哈希字符串格式：
//!
//! ```text
//! $<id>[$v=<version>][$<k1>=<v1>,<k2>=<v2>,...]$<salt-b64>$<hash-b64>
//! ```
//!
//! 解码是宽松的：缺少 version、params、salt 或 hash 时对应字段为 `None`，
//! 由各驱动决定哪些字段必须存在。只有结构性错误（例如首字符不是 `$`）
//! 才会返回 [`FormatError`]。
//!
//! ## 示例
//!
//! ```rust
//! use hashrs::phc::{self, PhcOptions, PhcParams};
//!
//! let options = PhcOptions::new("argon2i")
//!     .with_version(19)
//!     .with_params(PhcParams::new().with("m", 120).with("t", 5000).with("p", 2));
//!
//! let encoded = phc::serialize(b"some-salt-bytes", b"some-hash-bytes", &options).unwrap();
//! assert!(encoded.starts_with("$argon2i$v=19$m=120,t=5000,p=2$"));
//!
//! let node = phc::deserialize(&encoded).unwrap();
//! assert_eq!(node.id, "argon2i");
//! assert_eq!(node.version, Some(19));
//! assert_eq!(node.salt.as_deref(), Some(&b"some-salt-bytes"[..]));
//! ```

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use crate::error::{Error, FormatError, Result};

/// 标准 base64 字母表，编码时不带 `=`，解码时容忍填充与尾部多余比特
const PHC_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// 字段最多个数（包含 version 时）
const MAX_FIELDS: usize = 5;

/// 有序的参数表
///
/// 序列化时保持插入顺序，查找时与顺序无关。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhcParams(Vec<(String, u64)>);

impl PhcParams {
    /// 创建空参数表
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// 追加一个参数（构建器风格）
    pub fn with(mut self, key: impl Into<String>, value: u64) -> Self {
        self.insert(key, value);
        self
    }

    /// 插入参数，已存在的 key 会被原位覆盖
    pub fn insert(&mut self, key: impl Into<String>, value: u64) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// 按 key 查找参数
    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// 解码后的 PHC 字符串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhcNode {
    /// 算法标识，例如 `argon2id`
    pub id: String,
    /// 版本号；`None` 表示旧版无版本字符串
    pub version: Option<u32>,
    /// 算法参数
    pub params: Option<PhcParams>,
    /// 原始 salt 字节
    pub salt: Option<Vec<u8>>,
    /// 原始摘要字节
    pub hash: Option<Vec<u8>>,
}

/// 序列化选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhcOptions {
    pub id: String,
    pub version: Option<u32>,
    pub params: Option<PhcParams>,
}

impl PhcOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
            params: None,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_params(mut self, params: PhcParams) -> Self {
        self.params = Some(params);
        self
    }
}

/// 将 salt 与摘要序列化为 PHC 字符串
///
/// version 为 `None` 时省略 `v=` 段；params 为 `None` 或为空时省略整个参数段。
///
/// # Errors
///
/// id 或参数名不满足 `[a-z0-9-]{1,32}` 时返回 [`Error::Encoding`]。
pub fn serialize(salt: &[u8], hash: &[u8], options: &PhcOptions) -> Result<String> {
    if !is_valid_name(&options.id) {
        return Err(Error::Encoding(format!(
            "id must satisfy ^[a-z0-9-]{{1,32}}$, got \"{}\"",
            options.id
        )));
    }

    let mut out = format!("${}", options.id);

    if let Some(version) = options.version {
        out.push_str(&format!("$v={}", version));
    }

    if let Some(params) = options.params.as_ref().filter(|p| !p.is_empty()) {
        let mut pairs = Vec::with_capacity(params.len());
        for (key, value) in params.iter() {
            if !is_valid_name(key) {
                return Err(Error::Encoding(format!(
                    "param name must satisfy ^[a-z0-9-]{{1,32}}$, got \"{}\"",
                    key
                )));
            }
            pairs.push(format!("{}={}", key, value));
        }
        out.push('$');
        out.push_str(&pairs.join(","));
    }

    out.push('$');
    out.push_str(&PHC_B64.encode(salt));
    out.push('$');
    out.push_str(&PHC_B64.encode(hash));

    Ok(out)
}

/// 将 PHC 字符串解码为 [`PhcNode`]
///
/// # Errors
///
/// - 首字符不是 `$`：`pchstr must contain a $ as first char`
/// - 字段过多、id / 参数非法、参数值不是整数、base64 非法
pub fn deserialize(phc_string: &str) -> Result<PhcNode> {
    let Some(rest) = phc_string.strip_prefix('$') else {
        return Err(FormatError::MissingLeadingDollar.into());
    };

    let mut fields: Vec<&str> = rest.split('$').collect();

    let max_fields = if fields.get(1).is_some_and(|f| parse_version(f).is_some()) {
        MAX_FIELDS
    } else {
        MAX_FIELDS - 1
    };
    if fields.len() > max_fields {
        return Err(FormatError::TooManyFields {
            found: fields.len(),
            max: max_fields,
        }
        .into());
    }

    let id = fields.remove(0);
    if !is_valid_name(id) {
        return Err(FormatError::InvalidId(id.to_string()).into());
    }

    let mut version = None;
    if let Some(digits) = fields.first().and_then(|f| parse_version(f)) {
        let parsed = digits
            .parse::<u32>()
            .map_err(|_| FormatError::InvalidVersion(digits.to_string()))?;
        version = Some(parsed);
        fields.remove(0);
    }

    let mut salt = None;
    let mut hash = None;
    if fields.last().is_some_and(|f| is_b64_field(f)) {
        if fields.len() > 1 && is_b64_field(fields[fields.len() - 2]) {
            hash = fields.pop().map(|f| decode_b64(f, "hash")).transpose()?;
        }
        salt = fields.pop().map(|f| decode_b64(f, "salt")).transpose()?;
    }

    let params = fields.pop().map(parse_params).transpose()?;

    if !fields.is_empty() {
        return Err(FormatError::UnrecognizedFields(fields.join("$")).into());
    }

    Ok(PhcNode {
        id: id.to_string(),
        version,
        params,
        salt,
        hash,
    })
}

// ============================================================================
// 辅助函数
// ============================================================================

/// `^[a-z0-9-]{1,32}$`
fn is_valid_name(name: &str) -> bool {
    (1..=32).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// `^v=(0|[1-9]\d*)$`，返回数字部分
fn parse_version(field: &str) -> Option<&str> {
    field.strip_prefix("v=").filter(|d| is_decimal(d))
}

/// `^(0|[1-9]\d*)$`，拒绝符号与前导零
fn is_decimal(value: &str) -> bool {
    value == "0"
        || (!value.starts_with('0')
            && !value.is_empty()
            && value.bytes().all(|b| b.is_ascii_digit()))
}

/// `^[a-zA-Z0-9/+.-]*$`
fn is_b64_field(field: &str) -> bool {
    field
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'+' | b'.' | b'-'))
}

fn decode_b64(field: &str, name: &'static str) -> Result<Vec<u8>> {
    PHC_B64
        .decode(field)
        .map_err(|_| FormatError::InvalidBase64(name).into())
}

fn parse_params(segment: &str) -> Result<PhcParams> {
    let mut params = PhcParams::new();
    for pair in segment.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| FormatError::InvalidParams(format!("\"{}\" is not a key=value pair", pair)))?;
        if !is_valid_name(key) {
            return Err(FormatError::InvalidParams(format!("invalid param name \"{}\"", key)).into());
        }
        let value = Some(value)
            .filter(|v| is_decimal(v))
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                FormatError::InvalidParams(format!("param \"{}\" must be an integer", key))
            })?;
        params.insert(key, value);
    }
    Ok(params)
}
