//! 下游 Sink 契约。
//!
//! # 设计动机（Why）
//! - 分页缓冲在刷新时需要把已缓冲的字节按分配顺序交给下游（Socket、文件或上一层写入器），
//!   并等待每次写入被确认后再写下一段，才能保证输出顺序与追加顺序一致；
//! - 下游写入天然是异步的，因此契约以 `async` 方法表达，经由 `async-trait` 保持对象安全。
//!
//! # 契约说明（What）
//! - `write(buf)`：接收一段连续字节；返回 `Ok(())` 表示已交付给下一层（不保证落盘）；
//! - 失败时返回 `sink.write_failed`，被取消时返回分类为 `Cancelled` 的错误，
//!   调用方原样向上传播；
//! - Sink 由调用方持有，缓冲写入器从不关闭它。

use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait TextSink: Send {
    /// 写入一段连续字节，并等待下游确认。
    async fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// 写入字符串（UTF-8 编码）。
    async fn write_str(&mut self, text: &str) -> Result<()> {
        self.write(text.as_bytes()).await
    }

    /// 写入单个字符（UTF-8 编码）。
    async fn write_char(&mut self, ch: char) -> Result<()> {
        let mut encoded = [0u8; 4];
        let text: &str = ch.encode_utf8(&mut encoded);
        self.write(text.as_bytes()).await
    }
}

/// 内存 Sink：追加到 `Vec<u8>` 末尾，写入永不失败。
#[async_trait]
impl TextSink for Vec<u8> {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

/// 借用的 Sink：写入器只借用下游，生命周期结束后由调用方继续使用。
#[async_trait]
impl<S: TextSink + ?Sized> TextSink for &mut S {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf).await
    }
}
