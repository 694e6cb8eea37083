use quire_core::{
    CoreError, ErrorCategory, Result, RetryAdvice,
    error::codes,
};
use std::borrow::Cow;
use std::io;
use std::ops::Range;
use std::time::Duration;

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy)]
pub(crate) struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

#[cfg_attr(not(feature = "runtime-tokio"), allow(dead_code))]
pub(crate) const SINK_WRITE: OperationKind = OperationKind {
    code: codes::SINK_WRITE_FAILED,
    message: "sink write",
};
#[cfg_attr(not(feature = "runtime-tokio"), allow(dead_code))]
pub(crate) const SINK_FLUSH: OperationKind = OperationKind {
    code: codes::SINK_WRITE_FAILED,
    message: "sink flush",
};

/// 将 IO 错误映射为 CoreError，并附带错误分类。
///
/// 超时统一使用 `sink.timeout`，其余错误沿用操作自身的错误码。
#[cfg_attr(not(feature = "runtime-tokio"), allow(dead_code))]
pub(crate) fn map_io_error(kind: OperationKind, error: io::Error) -> CoreError {
    let category = categorize_io_error(&error);
    let code = match error.kind() {
        io::ErrorKind::TimedOut => codes::SINK_TIMEOUT,
        _ => kind.code,
    };
    CoreError::new(code, Cow::Owned(format!("{}: {}", kind.message, error)))
        .with_category(category)
        .with_cause(error)
}

#[cfg_attr(not(feature = "runtime-tokio"), allow(dead_code))]
fn categorize_io_error(error: &io::Error) -> ErrorCategory {
    use io::ErrorKind;
    match error.kind() {
        ErrorKind::TimedOut => ErrorCategory::Timeout,
        ErrorKind::WouldBlock | ErrorKind::Interrupted => {
            ErrorCategory::Retryable(RetryAdvice::after(Duration::from_millis(5)))
        }
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe => {
            ErrorCategory::Retryable(RetryAdvice::after(Duration::from_millis(50)))
        }
        ErrorKind::WriteZero => {
            ErrorCategory::Retryable(RetryAdvice::after(Duration::from_millis(10)))
        }
        ErrorKind::InvalidInput => ErrorCategory::InvalidArgument,
        _ => ErrorCategory::NonRetryable,
    }
}

/// 校验 `(offset, count)` 是否落在长度为 `len` 的切片内，返回对应区间。
///
/// 溢出或越界都视为调用方错误，调用方在此之前不得产生任何副作用。
pub(crate) fn checked_range(len: usize, offset: usize, count: usize) -> Result<Range<usize>> {
    match offset.checked_add(count) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(CoreError::invalid_argument(format!(
            "写入区间越界：offset {offset} + count {count} 超出源长度 {len}"
        ))),
    }
}
