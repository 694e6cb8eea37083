#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "quire-core: 分页写缓冲的核心契约。"]
#![doc = ""]
#![doc = "本 crate 只定义契约，不落地实现："]
#![doc = "- [`buffer`]：页（[`Page`]）与页池（[`PagePool`]）的租借/归还协议；"]
#![doc = "- [`sink`]：下游消费者（[`TextSink`]）的异步写入协议；"]
#![doc = "- [`error`]：跨层共享的 [`CoreError`] 与稳定错误码。"]
#![doc = ""]
#![doc = "具体的分页缓冲、缓冲写入器与默认页池位于 `quire-buffer`。"]

/// 重新导出 `async_trait`，实现 [`TextSink`] 时无需额外声明依赖。
pub use async_trait::async_trait;

pub mod buffer;
pub mod error;
pub mod sink;

pub use buffer::{Page, PageId, PagePool, PoolStats};
pub use error::{CoreError, ErrorCategory, Result, RetryAdvice};
pub use sink::TextSink;
