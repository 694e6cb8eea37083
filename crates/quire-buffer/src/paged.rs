use std::{fmt, sync::Arc};

use quire_core::{
    CoreError, Page, PageId, PagePool, Result, TextSink,
    error::codes,
};
use tracing::{trace, warn};

use crate::error::checked_range;

/// 每页可写入的字节数。
///
/// 页大小固定，用于在“租借次数”与“尾页浪费”之间取得平衡：
/// 页太小会频繁租借，页太大则每个缓冲至少常驻一整页。
pub const PAGE_SIZE: usize = 1024;

/// 一次批量归还的结果。
///
/// 归还过程从不因单页失败而中止：失败的错误被收集在 `failures` 中，
/// 其余页照常归还。
#[derive(Debug, Default)]
pub struct ReleaseReport {
    released: usize,
    failures: Vec<CoreError>,
}

impl ReleaseReport {
    /// 成功归还的页数。
    pub fn released(&self) -> usize {
        self.released
    }

    /// 归还失败的错误列表，顺序与归还顺序一致。
    pub fn failures(&self) -> &[CoreError] {
        &self.failures
    }

    /// 所有页是否都已成功归还。
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// `PagedBuffer` 以定长页累积输出，页从外部页池租借。
///
/// # 设计动机（Why）
/// - 大段输出若写入单块连续缓冲，扩容时需要整体搬运；按页追加则只在写满时租借新页，
///   已写内容从不移动；
/// - 页来自共享页池，刷新后可把不再需要的页归还，让多个缓冲实例复用同一批内存。
///
/// # 结构设计（How）
/// - `pages`：按租借顺序排列的页，即刷新时的输出顺序；
/// - 当前页恒为 `pages` 的最后一个元素；`cursor` 指向当前页下一个空闲位置；
/// - 不变量：除最后一页外所有页均已写满 [`PAGE_SIZE`] 字节，最后一页已用长度等于 `cursor`，
///   且 `0 <= cursor <= PAGE_SIZE`。
///
/// # 契约说明（What）
/// - `append_*`：拷贝输入，必要时透明跨页；从不阻塞，从不触碰 Sink；
/// - 页只在首次写入或当前页写满且仍有输入时才租借；恰好写满一页不会提前租借下一页；
/// - 租借失败原样返回给调用方，已拷贝的字节保留且计入 [`len`](Self::len)；
/// - 页池交回不可用的页（容量不足 [`PAGE_SIZE`]）时，该页立即归还，追加以错误结束；
/// - `Drop` 时执行 [`dispose`](Self::dispose)，所有页都会归还。
///
/// # 风险与取舍（Trade-offs）
/// - 单写者模型：变更操作均需 `&mut self`，不做内部加锁；
/// - 多字节字符可能跨页存放，逐页写出后拼接结果仍是原样的 UTF-8 字节流。
pub struct PagedBuffer {
    pool: Arc<dyn PagePool>,
    pages: Vec<Page>,
    cursor: usize,
}

impl PagedBuffer {
    /// 创建空缓冲，不租借任何页。
    pub fn new(pool: Arc<dyn PagePool>) -> Self {
        Self {
            pool,
            pages: Vec::new(),
            cursor: 0,
        }
    }

    /// 当前持有的页数。
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 当前页的写游标。
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 已缓冲的字节数。
    pub fn len(&self) -> usize {
        match self.pages.len() {
            0 => 0,
            n => (n - 1) * PAGE_SIZE + self.cursor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按租借顺序列出持有页的身份。
    pub fn page_ids(&self) -> Vec<PageId> {
        self.pages.iter().map(Page::id).collect()
    }

    /// 按租借顺序遍历每页的已用区间。
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let last = self.pages.len().saturating_sub(1);
        self.pages.iter().enumerate().map(move |(index, page)| {
            let used = if index == last { self.cursor } else { PAGE_SIZE };
            &page.as_slice()[..used]
        })
    }

    /// 追加单个字符（UTF-8 编码）。
    pub fn append_char(&mut self, ch: char) -> Result<()> {
        let mut encoded = [0u8; 4];
        let text: &str = ch.encode_utf8(&mut encoded);
        self.append_slice(text.as_bytes())
    }

    /// 追加字符串。
    pub fn append_str(&mut self, text: &str) -> Result<()> {
        self.append_slice(text.as_bytes())
    }

    /// 追加 `src[offset..offset + count]`。
    ///
    /// 区间越界时返回 `app.invalid_argument`，缓冲不发生任何变化。
    pub fn append_range(&mut self, src: &[u8], offset: usize, count: usize) -> Result<()> {
        let range = checked_range(src.len(), offset, count)?;
        self.append_slice(&src[range])
    }

    /// 追加整段字节，逐页拷贝直至耗尽输入。
    pub fn append_slice(&mut self, src: &[u8]) -> Result<()> {
        let mut remaining = src;
        while !remaining.is_empty() {
            let (page, cursor) = self.writable_page()?;
            let start = *cursor;
            let copy_len = remaining.len().min(PAGE_SIZE - start);
            debug_assert!(copy_len > 0, "可写页必须至少留有一个空位");

            page.as_mut_slice()[start..start + copy_len].copy_from_slice(&remaining[..copy_len]);
            *cursor += copy_len;
            remaining = &remaining[copy_len..];
        }
        Ok(())
    }

    /// 按租借顺序把全部已用区间写入 `sink`，每段写入确认后才写下一段。
    ///
    /// 缓冲本身不发生变化：写入中途失败或被取消时，所有页仍保留在缓冲中，
    /// 重试会从第一页重新输出（下游可能因此收到重复内容）。
    pub async fn drain_to<S: TextSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        for chunk in self.chunks() {
            if chunk.is_empty() {
                continue;
            }
            sink.write(chunk).await?;
        }
        Ok(())
    }

    /// 归还除最近租借的一页外的所有页，并清空保留页（游标归零）。
    ///
    /// 保留页不重新租借，连续的小规模刷新因此不会反复租借/归还。
    pub fn recycle_all_but_last(&mut self) -> ReleaseReport {
        let retained = self.pages.pop();
        let released = release_pages(self.pool.as_ref(), self.pages.drain(..));
        self.pages.extend(retained);
        self.cursor = 0;
        released
    }

    /// 归还全部页并清空缓冲；对空缓冲重复调用不产生任何页池交互。
    pub fn dispose(&mut self) -> ReleaseReport {
        self.cursor = 0;
        release_pages(self.pool.as_ref(), self.pages.drain(..))
    }

    /// 返回当前页及其写游标；当前页不存在或已写满时先租借新页。
    fn writable_page(&mut self) -> Result<(&mut Page, &mut usize)> {
        if self.pages.is_empty() || self.cursor == PAGE_SIZE {
            let page = self.rent_page()?;
            self.pages.push(page);
            self.cursor = 0;
        }
        // 上面的分支保证 `pages` 非空。
        let last = self.pages.len() - 1;
        Ok((&mut self.pages[last], &mut self.cursor))
    }

    /// 租借一页并校验容量；不可用的页立即归还。
    fn rent_page(&self) -> Result<Page> {
        let page = self.pool.rent(PAGE_SIZE)?;
        if page.capacity() < PAGE_SIZE {
            let id = page.id();
            let capacity = page.capacity();
            if let Err(err) = self.pool.give_back(page) {
                warn!(page = %id, error = %err, "returning undersized page failed");
            }
            return Err(CoreError::new(
                codes::BUFFER_PAGE_TOO_SMALL,
                format!("{id} 容量 {capacity} 小于页大小 {PAGE_SIZE}"),
            ));
        }
        trace!(page = %page.id(), held = self.pages.len() + 1, "rented page");
        Ok(page)
    }
}

impl Drop for PagedBuffer {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}

impl fmt::Debug for PagedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedBuffer")
            .field("pages", &self.page_ids())
            .field("cursor", &self.cursor)
            .field("len", &self.len())
            .finish()
    }
}

fn release_pages(pool: &dyn PagePool, pages: impl IntoIterator<Item = Page>) -> ReleaseReport {
    let mut report = ReleaseReport::default();
    for page in pages {
        let id = page.id();
        match pool.give_back(page) {
            Ok(()) => report.released += 1,
            Err(err) => {
                warn!(page = %id, error = %err, "page release failed, continuing with remaining pages");
                report.failures.push(err);
            }
        }
    }
    report
}
