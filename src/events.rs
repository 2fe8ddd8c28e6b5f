//! 哈希管理器事件
//!
//! [`HashManager`](crate::HashManager) 在关键节点（创建 hasher、命中缓存、
//! 启用 / 恢复 fake 等）产生 [`HashEvent`]，交给注入的 [`HashEventSink`]。
//! 默认使用 [`NoOpEventSink`]。
//!
//! 事件中不会包含明文或哈希值。
//!
//! ## 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use hashrs::events::{HashEventKind, InMemoryEventSink};
//! use hashrs::{HashManager, HashManagerConfig};
//!
//! let sink = Arc::new(InMemoryEventSink::new());
//! let manager = HashManager::new(HashManagerConfig::new()).with_event_sink(sink.clone());
//!
//! manager.fake();
//! manager.restore();
//!
//! assert_eq!(sink.events_by_kind(HashEventKind::FakeEnabled).len(), 1);
//! assert_eq!(sink.events_by_kind(HashEventKind::FakeRestored).len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashEventKind {
    /// 管理器已创建
    ManagerCreated,
    /// 新建了 hasher 实例
    HasherCreated,
    /// 使用了缓存中的 hasher
    HasherReused,
    /// 注册了自定义驱动
    DriverExtended,
    /// 启用 fake 模式
    FakeEnabled,
    /// 恢复真实驱动
    FakeRestored,
}

impl fmt::Display for HashEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashEventKind::ManagerCreated => write!(f, "manager_created"),
            HashEventKind::HasherCreated => write!(f, "hasher_created"),
            HashEventKind::HasherReused => write!(f, "hasher_reused"),
            HashEventKind::DriverExtended => write!(f, "driver_extended"),
            HashEventKind::FakeEnabled => write!(f, "fake_enabled"),
            HashEventKind::FakeRestored => write!(f, "fake_restored"),
        }
    }
}

/// 管理器事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashEvent {
    /// 事件类型
    pub kind: HashEventKind,
    /// 逻辑 hasher 名称（如果适用）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hasher: Option<String>,
    /// 驱动名称（如果适用）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// 额外详情
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl HashEvent {
    /// 创建新事件
    pub fn new(kind: HashEventKind) -> Self {
        Self {
            kind,
            hasher: None,
            driver: None,
            details: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_hasher(mut self, hasher: impl Into<String>) -> Self {
        self.hasher = Some(hasher.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// HashEventSink Trait
// ============================================================================

/// 事件接收器
pub trait HashEventSink: Send + Sync {
    /// 记录事件
    fn record(&self, event: HashEvent);
}

// ============================================================================
// InMemoryEventSink
// ============================================================================

/// 内存事件接收器
///
/// 用于测试，克隆后共享同一个事件列表。
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventSink {
    events: Arc<RwLock<Vec<HashEvent>>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取所有事件
    pub fn events(&self) -> Vec<HashEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 按类型获取事件
    pub fn events_by_kind(&self, kind: HashEventKind) -> Vec<HashEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空所有事件
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl HashEventSink for InMemoryEventSink {
    fn record(&self, event: HashEvent) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

// ============================================================================
// NoOpEventSink
// ============================================================================

/// 丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventSink;

impl HashEventSink for NoOpEventSink {
    fn record(&self, _event: HashEvent) {}
}

// ============================================================================
// 测试
// ============================================================================
