use std::fmt;

use bytes::BytesMut;

/// 页的身份标识，由页池在租借时分配。
///
/// - `origin`：签发页池的唯一编号，页池据此拒绝归还的外来页；
/// - `seq`：页池内部的递增序号。
///
/// 页以身份而非内容区分：两页内容相同仍是不同的页。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    origin: u64,
    seq: u64,
}

impl PageId {
    /// 由页池构造身份标识。
    pub const fn new(origin: u64, seq: u64) -> Self {
        Self { origin, seq }
    }

    /// 签发页池编号。
    pub const fn origin(&self) -> u64 {
        self.origin
    }

    /// 页池内序号。
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}.{}", self.origin, self.seq)
    }
}

/// `Page` 是从页池租借的定长可写字节区。
///
/// # 设计动机（Why）
/// - 分页缓冲需要固定容量的线性内存块，写满后再租借下一块，避免单块缓冲反复扩容搬运；
/// - 页一旦租出即由持有者独占，归还时所有权转移回页池。
///
/// # 契约说明（What）
/// - `Page` 不实现 `Clone`：同一页不可能被两处持有，也不可能被重复归还；
/// - `capacity()` 在页的生命周期内保持不变；
/// - 页不记录“已写入长度”，已用区间由持有者（分页缓冲的写游标）追踪。
///
/// # 风险提示（Trade-offs）
/// - 复用的页保留上一次租借写入的旧内容，持有者只能读取自己写入过的区间。
pub struct Page {
    id: PageId,
    data: BytesMut,
}

impl Page {
    /// 分配一块零初始化的新页。
    pub fn new(id: PageId, capacity: usize) -> Self {
        Self {
            id,
            data: BytesMut::zeroed(capacity),
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .finish()
    }
}
