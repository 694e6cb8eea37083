use std::{fmt, sync::Arc};

use quire_core::{CoreError, PagePool, Result, TextSink};
use tracing::{debug, trace, warn};

use crate::{
    error::checked_range,
    paged::{PagedBuffer, ReleaseReport},
};

/// `PagedBufferedWriter` 把下游 Sink 与一个独占的 [`PagedBuffer`] 组合为写入器。
///
/// # 设计动机（Why）
/// - 模板渲染等场景会产生大量零碎写入，逐次写 Sink 代价高昂；先在分页缓冲中合并，
///   到显式刷新点再一次性按页输出；
/// - 大块内容直接转发给 Sink 时无需拷贝进缓冲，因此保留一组直通写入方法。
///
/// # 双写入路径（What）
/// - **缓冲写入**（[`write_char`](Self::write_char)、[`write_str`](Self::write_str)、
///   [`write_bytes`](Self::write_bytes)、[`write_range`](Self::write_range)）：只追加到缓冲，
///   不与 Sink 发生任何同步或异步交互；
/// - **直通写入**（`write_*_async`）：绕过缓冲，直接等待 Sink 完成；
/// - **顺序风险**：两种写法交错时，Sink 上的顺序由刷新时机决定，而不是调用顺序。
///   例如 `write_str("A")`、`write_str_async("B")`、`flush_async()` 之后 Sink 收到的是 `"BA"`。
///   需要严格顺序的调用方只能使用其中一种写法。
///
/// # 契约说明（What）
/// - [`flush_async`](Self::flush_async)：缓冲无页时立即返回；否则按序写出全部页，再归还除最后一页外的页；
/// - [`flush`](Self::flush)：同步刷新是空操作，既不丢弃也不阻塞；
/// - [`dispose`](Self::dispose)/`Drop`：归还缓冲的全部页，从不关闭 Sink；
/// - 单写者：所有方法都需要 `&mut self`，调用方负责串行化。
///
/// # 取消语义
/// - 丢弃 `flush_async` 返回的 Future 或 Sink 返回取消错误时，错误原样上抛；
///   页只在完整写出后才回收，未写出的页留在缓冲中，重新刷新时从第一页开始，
///   Sink 可能已收到部分内容。
pub struct PagedBufferedWriter<S> {
    sink: S,
    buffer: PagedBuffer,
}

impl<S: TextSink> PagedBufferedWriter<S> {
    /// 以共享页池与下游 Sink 构造写入器；构造时不租借任何页。
    pub fn new(pool: Arc<dyn PagePool>, sink: S) -> Self {
        Self {
            sink,
            buffer: PagedBuffer::new(pool),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn buffer(&self) -> &PagedBuffer {
        &self.buffer
    }

    /// 缓冲写入单个字符。
    pub fn write_char(&mut self, ch: char) -> Result<()> {
        self.buffer.append_char(ch)
    }

    /// 缓冲写入字符串。
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.buffer.append_str(text)
    }

    /// 缓冲写入整段字节。
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.buffer.append_slice(src)
    }

    /// 缓冲写入 `src[offset..offset + count]`，越界时不产生任何写入。
    pub fn write_range(&mut self, src: &[u8], offset: usize, count: usize) -> Result<()> {
        self.buffer.append_range(src, offset, count)
    }

    /// 直通写入单个字符。
    pub async fn write_char_async(&mut self, ch: char) -> Result<()> {
        self.sink.write_char(ch).await
    }

    /// 直通写入字符串。
    pub async fn write_str_async(&mut self, text: &str) -> Result<()> {
        self.sink.write_str(text).await
    }

    /// 直通写入整段字节。
    pub async fn write_bytes_async(&mut self, src: &[u8]) -> Result<()> {
        self.sink.write(src).await
    }

    /// 直通写入 `src[offset..offset + count]`，越界时不触碰 Sink。
    pub async fn write_range_async(&mut self, src: &[u8], offset: usize, count: usize) -> Result<()> {
        let range = checked_range(src.len(), offset, count)?;
        self.sink.write(&src[range]).await
    }

    /// 把缓冲内容按序交付给 Sink，之后缓冲最多保留一页。
    ///
    /// 回收阶段的归还失败只记录日志：内容此时已经交付，调用方无需感知。
    pub async fn flush_async(&mut self) -> Result<()> {
        if self.buffer.page_count() == 0 {
            return Ok(());
        }

        let bytes = self.buffer.len();
        let pages = self.buffer.page_count();
        self.buffer.drain_to(&mut self.sink).await?;
        let report = self.buffer.recycle_all_but_last();
        debug!(
            bytes,
            pages,
            recycled = report.released(),
            release_failures = report.failures().len(),
            "flushed paged buffer"
        );
        Ok(())
    }

    /// 同步刷新：空操作。
    ///
    /// Sink 只有异步写入契约，缓冲内容只能经由 [`flush_async`](Self::flush_async) 交付。
    pub fn flush(&mut self) {
        trace!(
            buffered = self.buffer.len(),
            "synchronous flush ignored, call flush_async to deliver buffered output"
        );
    }

    /// 归还缓冲持有的全部页；Sink 保持不变。
    pub fn dispose(&mut self) -> ReleaseReport {
        self.buffer.dispose()
    }

    /// 归还全部页并交回 Sink。未刷新的缓冲内容随之丢弃。
    pub fn into_inner(self) -> S {
        let Self { sink, mut buffer } = self;
        let _ = buffer.dispose();
        sink
    }
}

/// 以 `write!`/`writeln!` 进行缓冲写入；底层错误记录日志后折叠为 [`fmt::Error`]。
impl<S: TextSink> fmt::Write for PagedBufferedWriter<S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.append_str(s).map_err(fold_fmt_error)
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.buffer.append_char(c).map_err(fold_fmt_error)
    }
}

fn fold_fmt_error(err: CoreError) -> fmt::Error {
    warn!(code = err.code(), error = %err, "buffered fmt write failed");
    fmt::Error
}

impl<S: fmt::Debug> fmt::Debug for PagedBufferedWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedBufferedWriter")
            .field("sink", &self.sink)
            .field("buffer", &self.buffer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlabPagePool;
    use futures::executor::block_on;
    use std::fmt::Write as _;

    fn writer() -> PagedBufferedWriter<Vec<u8>> {
        PagedBufferedWriter::new(Arc::new(SlabPagePool::new()), Vec::new())
    }

    #[test]
    fn fmt_write_goes_through_buffer() {
        let mut w = writer();
        write!(w, "{}-{}", 7, "seven").expect("格式化写入");
        assert!(w.sink().is_empty(), "缓冲写入不应触碰 Sink");

        block_on(w.flush_async()).expect("刷新");
        assert_eq!(w.sink().as_slice(), b"7-seven");
    }

    #[test]
    fn sync_flush_keeps_buffered_output() {
        let mut w = writer();
        w.write_str("pending").expect("写入");
        w.flush();
        assert!(w.sink().is_empty());
        assert_eq!(w.buffer().len(), 7);
    }

    #[test]
    fn into_inner_returns_sink_and_releases_pages() {
        let pool = Arc::new(SlabPagePool::new());
        let mut w = PagedBufferedWriter::new(pool.clone(), Vec::<u8>::new());
        w.write_str("abc").expect("写入");
        block_on(w.flush_async()).expect("刷新");
        let sink = w.into_inner();
        assert_eq!(sink, b"abc");
        assert_eq!(pool.statistics().active_leases, 0);
    }

    #[test]
    #[tracing_test::traced_test]
    fn fmt_write_failure_is_logged_with_code() {
        let pool = Arc::new(SlabPagePool::with_config(
            crate::SlabPoolConfig::default().with_max_leased_pages(Some(1)),
        ));
        let held = pool.rent(crate::PAGE_SIZE).expect("占用唯一租约");
        let mut w = PagedBufferedWriter::new(pool.clone(), Vec::<u8>::new());

        assert!(write!(w, "{}", 42).is_err(), "页池耗尽时格式化写入应失败");
        assert!(logs_contain("buffered fmt write failed"));
        assert!(logs_contain("buffer.allocation_failed"));
        drop(held);
    }
}
