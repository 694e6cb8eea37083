use crate::{Result, buffer::Page};

/// `PagePool` 描述分页缓冲所依赖的页池能力。
///
/// # 设计背景（Why）
/// - 分页缓冲按页租借、写满后归还，以此控制内存峰值，页池是跨缓冲实例共享的可变资源；
/// - 以 trait 对象注入（`Arc<dyn PagePool>`）而非全局单例，测试可替换为记录型假实现，
///   精确观测泄漏与重复归还。
///
/// # 契约说明（What）
/// - **线程安全**：多个独立的缓冲实例可在任意线程并发调用 `rent`/`give_back`，
///   同步策略由实现自行负责；
/// - `rent(min_len)`：返回容量不小于 `min_len` 的页；无法提供时返回
///   `buffer.allocation_failed` 错误，调用方不得假设会自动重试；
/// - `give_back(page)`：归还页以供复用。归还非本池签发的页属于调用方错误，
///   实现可拒绝（返回错误），但不得因此破坏与该页无关的内部状态；
/// - `statistics()`：可选的统计快照，默认返回空快照。
///
/// # 风险提示（Trade-offs）
/// - `give_back` 返回错误时页的所有权已交给实现，调用方不应也无法再次归还同一页。
pub trait PagePool: Send + Sync + 'static {
    /// 租借一页。
    fn rent(&self, min_len: usize) -> Result<Page>;

    /// 归还一页。
    fn give_back(&self, page: Page) -> Result<()>;

    /// 读取统计快照。
    fn statistics(&self) -> PoolStats {
        PoolStats::default()
    }
}

/// 页池统计快照。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// 页池累计新分配的页数（不含复用）。
    pub allocated_pages: usize,
    /// 当前缓存在自由链表中、可直接复用的页数。
    pub cached_pages: usize,
    /// 当前处于租借状态的页数。
    pub active_leases: usize,
    /// 累计租借失败次数。
    pub failed_acquisitions: u64,
    /// 累计被拒绝的归还次数。
    pub rejected_returns: u64,
}
