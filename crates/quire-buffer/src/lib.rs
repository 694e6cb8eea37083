#![doc = r#"
# quire-buffer

## 设计动机（Why）
- **定位**：为 `quire-core` 的页池与 Sink 契约提供具体实现：分页缓冲
  [`PagedBuffer`]、缓冲写入器 [`PagedBufferedWriter`]、默认页池 [`SlabPagePool`]。
- **内存模型**：输出先以定长页（[`PAGE_SIZE`] 字节）累积，刷新时按分配顺序写入下游，
  随后只保留最后一页、其余归还页池，使常驻内存有界。

## 核心契约（What）
- 缓冲写入（`write_*`）只追加到页中，从不触碰 Sink；
- 直通写入（`write_*_async`）绕过缓冲直接写 Sink。两种写法混用时，
  Sink 上的顺序由刷新时机决定而非调用顺序：缓冲内容要等到下一次
  [`PagedBufferedWriter::flush_async`] 才输出，直通内容立即输出。
  需要严格顺序的调用方只能使用其中一种写法；
- 同步 [`PagedBufferedWriter::flush`] 刻意为空操作，缓冲内容只能经由异步刷新交付；
- 租借失败直接返回给触发租借的调用；归还失败被汇总进 [`ReleaseReport`]
  并记录日志，不会中断剩余页的归还。

## 实现策略（How）
- 页池以 `Arc<dyn PagePool>` 注入，可在多个写入器之间共享；
- 单写者模型：所有变更操作都要求 `&mut self`，不做内部加锁；
- Tokio 适配层 [`AsyncWriteSink`] 由 `runtime-tokio` 特性控制（默认开启）。
"#]

mod config;
mod error;
mod paged;
mod pool;
#[cfg(feature = "runtime-tokio")]
mod tokio_sink;
mod writer;

pub use config::{ConfigError, SlabPoolConfig};
pub use paged::{PAGE_SIZE, PagedBuffer, ReleaseReport};
pub use pool::SlabPagePool;
#[cfg(feature = "runtime-tokio")]
pub use tokio_sink::AsyncWriteSink;
pub use writer::PagedBufferedWriter;
