//! 页与页池契约模块。
//!
//! # 模块架构（Why）
//! - 分页缓冲只关心“租借一页，写满后归还”，不关心页池如何分配内存；
//!   因此将页（[`page`]）与页池协议（[`pool`]）拆分为独立子模块。
//! - 页池以 trait 对象注入，便于在测试中用记录型假实现观测租借/归还次数。
//!
//! # 设计总览（How）
//! - [`page`] 定义独占所有权的定长页 [`Page`] 及其身份标识 [`PageId`]；
//! - [`pool`] 约束租借/归还接口 [`PagePool`] 与统计快照 [`PoolStats`]。

pub mod page;
pub mod pool;

pub use page::{Page, PageId};
pub use pool::{PagePool, PoolStats};
