use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use quire_core::{CoreError, Page, PageId, PagePool, PoolStats, Result, error::codes};
use spin::Mutex;
use tracing::trace;

use crate::config::SlabPoolConfig;

/// 页池编号分配器，保证每个池签发的 [`PageId`] 可区分来源。
static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// `SlabPagePool` 提供基于自由链表（Free List）的默认页池实现，
/// 在多个写入器之间复用页，减少堆分配次数。
///
/// # 模块角色（Why）
/// - 作为 [`PagePool`] 的默认实现，供宿主直接注入 `PagedBufferedWriter`；
/// - 页归还后进入自由链表，下一次租借优先复用，刷新后的尾页回收不再触发重新分配。
///
/// # 核心机制（How）
/// - 内部以 `spin::Mutex` 保护自由链表与借出页序号集合，租借时优先取容量足够的页；
/// - 原子计数跟踪累计分配、失败与拒绝次数，支撑 [`statistics`](PagePool::statistics) 快照；
/// - 每个池持有唯一的 `origin` 编号并写入签发页的 [`PageId`]；借出时登记序号与页存储地址，
///   归还时三者都吻合才接收，重复归还与按身份伪造的页都会被拒绝。
///
/// # 契约说明（What）
/// - **线程安全**：共享状态由自旋锁与原子计数保护，可在任意线程并发租借/归还；
/// - **上限**：配置了 `max_leased_pages` 时，超出上限的租借返回 `buffer.allocation_failed`；
/// - **外来页**：其它池签发的页，或与借出登记不符的页（重复归还、伪造身份），
///   返回 `buffer.foreign_page` 并计入 `rejected_returns`，租约与自由链表保持不变。
///
/// # 设计权衡（Trade-offs）
/// - 自旋锁临界区包含自由链表存取与借出登记，自由链表未命中时新页在锁内分配并登记存储地址；
/// - 复用页不清零，页内旧内容由持有者的写游标屏蔽；
/// - `shrink_to_fit` 采取“清空自由链表”的简单策略，便于压测后快速归还峰值内存。
#[derive(Clone)]
pub struct SlabPagePool {
    inner: Arc<PoolInner>,
}

impl Default for SlabPagePool {
    fn default() -> Self {
        Self::with_config(SlabPoolConfig::default())
    }
}

impl SlabPagePool {
    /// 使用默认配置创建空池。
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用给定配置创建空池。
    pub fn with_config(config: SlabPoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner::new(config)),
        }
    }

    pub fn config(&self) -> &SlabPoolConfig {
        &self.inner.config
    }

    /// 清空自由链表，返回释放的字节数。
    pub fn shrink_to_fit(&self) -> usize {
        self.inner.shrink_free_list()
    }
}

impl PagePool for SlabPagePool {
    fn rent(&self, min_len: usize) -> Result<Page> {
        self.inner.acquire_page(min_len)
    }

    fn give_back(&self, page: Page) -> Result<()> {
        self.inner.reclaim_page(page)
    }

    fn statistics(&self) -> PoolStats {
        self.inner.snapshot()
    }
}

struct PoolInner {
    origin: u64,
    config: SlabPoolConfig,
    state: Mutex<SlabState>,
    next_seq: AtomicU64,
    metrics: PoolMetrics,
}

/// 自旋锁保护的可变状态：空闲页与借出登记必须在同一临界区内更新。
///
/// `leased` 以序号映射到页存储的起始地址。仅凭 [`PageId`] 可以伪造出同名页，
/// 存储地址则只有真正借出的那一页才持有。
#[derive(Default)]
struct SlabState {
    free_list: Vec<Page>,
    leased: HashMap<u64, usize>,
}

fn storage_addr(page: &Page) -> usize {
    page.as_slice().as_ptr() as usize
}

impl PoolInner {
    fn new(config: SlabPoolConfig) -> Self {
        Self {
            origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
            config,
            state: Mutex::new(SlabState::default()),
            next_seq: AtomicU64::new(0),
            metrics: PoolMetrics::default(),
        }
    }

    fn acquire_page(&self, min_len: usize) -> Result<Page> {
        let mut state = self.state.lock();
        if let Some(limit) = self.config.max_leased_pages
            && state.leased.len() >= limit
        {
            drop(state);
            self.metrics.failed_acquisitions.fetch_add(1, Ordering::Relaxed);
            return Err(CoreError::allocation_failed(format!(
                "页池借出页数已达上限 {limit}"
            )));
        }

        let reused = state
            .free_list
            .iter()
            .position(|page| page.capacity() >= min_len)
            .map(|index| state.free_list.swap_remove(index));
        let page = match reused {
            Some(page) => page,
            None => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                self.metrics.allocated_pages.fetch_add(1, Ordering::Relaxed);
                // 容量至少为 1，保证每页的存储地址互不相同。
                Page::new(PageId::new(self.origin, seq), min_len.max(1))
            }
        };
        state.leased.insert(page.id().seq(), storage_addr(&page));
        drop(state);

        trace!(page = %page.id(), "slab pool leased page");
        Ok(page)
    }

    fn reclaim_page(&self, page: Page) -> Result<()> {
        let id = page.id();
        if id.origin() != self.origin {
            return Err(self.reject(format!("{id} 不是由页池 #{} 签发的", self.origin)));
        }

        let mut state = self.state.lock();
        match state.leased.get(&id.seq()) {
            Some(&addr) if addr == storage_addr(&page) => {
                state.leased.remove(&id.seq());
            }
            _ => {
                drop(state);
                return Err(self.reject(format!(
                    "{id} 不是当前借出的页，拒绝重复或伪造的归还"
                )));
            }
        }
        if state.free_list.len() < self.config.max_cached_pages {
            state.free_list.push(page);
        }
        Ok(())
    }

    fn reject(&self, message: String) -> CoreError {
        self.metrics.rejected_returns.fetch_add(1, Ordering::Relaxed);
        CoreError::new(codes::BUFFER_FOREIGN_PAGE, message)
    }

    fn shrink_free_list(&self) -> usize {
        let mut state = self.state.lock();
        let reclaimed = state.free_list.iter().map(Page::capacity).sum();
        state.free_list.clear();
        reclaimed
    }

    fn snapshot(&self) -> PoolStats {
        let (cached_pages, active_leases) = {
            let state = self.state.lock();
            (state.free_list.len(), state.leased.len())
        };
        PoolStats {
            allocated_pages: self.metrics.allocated_pages.load(Ordering::Relaxed),
            cached_pages,
            active_leases,
            failed_acquisitions: self.metrics.failed_acquisitions.load(Ordering::Relaxed),
            rejected_returns: self.metrics.rejected_returns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct PoolMetrics {
    allocated_pages: AtomicUsize,
    failed_acquisitions: AtomicU64,
    rejected_returns: AtomicU64,
}
