use async_trait::async_trait;
use quire_core::{Result, TextSink};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{SINK_FLUSH, SINK_WRITE, map_io_error};

/// 将 Tokio 的 [`AsyncWrite`] 适配为 [`TextSink`]。
///
/// ## 意图（Why）
/// - 让分页写入器可以直接刷新到 `TcpStream`、`File` 或 `DuplexStream` 等 Tokio 写端，
///   而无需调用方手写适配层。
///
/// ## 契约（What）
/// - `write`：以 `write_all` 写完整段字节后才返回，保持逐页顺序；
/// - IO 错误映射为 `sink.write_failed`，并按错误种类标注分类（超时、可重试等），
///   原始 `io::Error` 保留在 `source()` 链中；
/// - 适配器从不关闭底层写端，[`into_inner`](Self::into_inner) 交回所有权。
#[derive(Debug)]
pub struct AsyncWriteSink<W> {
    inner: W,
}

impl<W> AsyncWriteSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// 冲刷底层写端的内部缓冲。
    pub async fn flush_inner(&mut self) -> Result<()> {
        self.inner
            .flush()
            .await
            .map_err(|err| map_io_error(SINK_FLUSH, err))
    }
}

#[async_trait]
impl<W> TextSink for AsyncWriteSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner
            .write_all(buf)
            .await
            .map_err(|err| map_io_error(SINK_WRITE, err))
    }
}
