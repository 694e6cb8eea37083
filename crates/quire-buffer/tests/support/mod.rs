//! 集成测试共享的记录型页池与 Sink。
//!
//! - `RecordingPool`：记录每次租借/归还，可在第 N 次租借或第 N 次归还时注入失败，
//!   并检测重复归还与外来页；
//! - `RecordingSink`：记录每次写入的字节段，可在第 N 次写入时注入失败或取消。

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use quire_core::{
    CoreError, ErrorCategory, Page, PageId, PagePool, PoolStats, Result, TextSink, async_trait,
    error::codes,
};

#[derive(Default)]
struct PoolState {
    rent_attempts: usize,
    return_attempts: usize,
    next_seq: u64,
    outstanding: HashSet<PageId>,
    rented: Vec<PageId>,
    returned: Vec<PageId>,
    violations: usize,
}

/// 记录型页池。
pub struct RecordingPool {
    state: Mutex<PoolState>,
    page_capacity: Option<usize>,
    fail_rent_at: Option<usize>,
    fail_return_at: Option<usize>,
}

impl RecordingPool {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            page_capacity: None,
            fail_rent_at: None,
            fail_return_at: None,
        }
    }

    /// 第 `attempt` 次（从 1 开始）及之后的租借全部失败。
    pub fn fail_rent_at(mut self, attempt: usize) -> Self {
        self.fail_rent_at = Some(attempt);
        self
    }

    /// 仅第 `attempt` 次（从 1 开始）归还失败，页仍被视为已交回。
    pub fn fail_return_at(mut self, attempt: usize) -> Self {
        self.fail_return_at = Some(attempt);
        self
    }

    /// 固定签发页的容量，忽略请求的最小长度。
    pub fn with_page_capacity(mut self, capacity: usize) -> Self {
        self.page_capacity = Some(capacity);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().expect("mutex poisoned")
    }

    /// 成功租借的页数。
    pub fn rents(&self) -> usize {
        self.state().rented.len()
    }

    pub fn rent_attempts(&self) -> usize {
        self.state().rent_attempts
    }

    /// 已交回（无论归还调用是否报错）的页数。
    pub fn returns(&self) -> usize {
        self.state().returned.len()
    }

    pub fn return_attempts(&self) -> usize {
        self.state().return_attempts
    }

    /// 租借与归还调用总数。
    pub fn interactions(&self) -> usize {
        let state = self.state();
        state.rent_attempts + state.return_attempts
    }

    /// 仍处于借出状态的页数。
    pub fn outstanding(&self) -> usize {
        self.state().outstanding.len()
    }

    /// 重复归还或归还外来页的次数。
    pub fn violations(&self) -> usize {
        self.state().violations
    }

    pub fn rented_ids(&self) -> Vec<PageId> {
        self.state().rented.clone()
    }

    pub fn returned_ids(&self) -> Vec<PageId> {
        self.state().returned.clone()
    }
}

impl PagePool for RecordingPool {
    fn rent(&self, min_len: usize) -> Result<Page> {
        let mut state = self.state();
        state.rent_attempts += 1;
        if self
            .fail_rent_at
            .is_some_and(|attempt| state.rent_attempts >= attempt)
        {
            return Err(CoreError::allocation_failed(format!(
                "第 {} 次租借被注入失败",
                state.rent_attempts
            )));
        }
        let id = PageId::new(0, state.next_seq);
        state.next_seq += 1;
        state.outstanding.insert(id);
        state.rented.push(id);
        Ok(Page::new(id, self.page_capacity.unwrap_or(min_len)))
    }

    fn give_back(&self, page: Page) -> Result<()> {
        let mut state = self.state();
        state.return_attempts += 1;
        let id = page.id();
        if !state.outstanding.remove(&id) {
            state.violations += 1;
        }
        state.returned.push(id);
        if self.fail_return_at == Some(state.return_attempts) {
            return Err(CoreError::new(
                codes::BUFFER_RELEASE_FAILED,
                format!("第 {} 次归还被注入失败", state.return_attempts),
            ));
        }
        Ok(())
    }

    fn statistics(&self) -> PoolStats {
        let state = self.state();
        PoolStats {
            allocated_pages: state.rented.len(),
            active_leases: state.outstanding.len(),
            ..PoolStats::default()
        }
    }
}

/// 记录型 Sink。
#[derive(Default)]
pub struct RecordingSink {
    pub data: Vec<u8>,
    pub writes: Vec<Vec<u8>>,
    fail_at: Option<usize>,
    cancel_at: Option<usize>,
    attempts: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第 `attempt` 次（从 1 开始）写入返回 `sink.write_failed`，不接收任何字节。
    pub fn fail_at(mut self, attempt: usize) -> Self {
        self.fail_at = Some(attempt);
        self
    }

    /// 第 `attempt` 次（从 1 开始）写入返回取消错误。
    pub fn cancel_at(mut self, attempt: usize) -> Self {
        self.cancel_at = Some(attempt);
        self
    }

    /// 取消注入的失败，后续写入全部成功。
    pub fn heal(&mut self) {
        self.fail_at = None;
        self.cancel_at = None;
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.data.clone()).expect("Sink 内容应为合法 UTF-8")
    }
}

#[async_trait]
impl TextSink for RecordingSink {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.attempts += 1;
        if self.fail_at == Some(self.attempts) {
            return Err(CoreError::new(codes::SINK_WRITE_FAILED, "注入的写入失败"));
        }
        if self.cancel_at == Some(self.attempts) {
            return Err(CoreError::new(codes::SINK_CANCELLED, "注入的取消")
                .with_category(ErrorCategory::Cancelled));
        }
        self.data.extend_from_slice(buf);
        self.writes.push(buf.to_vec());
        Ok(())
    }
}
