use std::{borrow::Cow, error::Error, fmt, time::Duration};

/// `CoreError` 表示 `quire` 各层共享的稳定错误域。
///
/// # 设计背景（Why）
/// - 页池耗尽、Sink 写入失败、调用方传参错误三类故障会在缓冲、写入器与适配层之间流转，
///   需要合流为统一的错误码，调用方才能据此决定重试、放弃或修正调用。
///
/// # 逻辑解析（How）
/// - `code` 为 `'static` 字符串，承载稳定语义（见 [`codes`]）；`message` 面向排障人员；
/// - `cause` 保存底层原因（例如 `std::io::Error`），通过 `source()` 暴露完整链路；
/// - `category` 显式标注处置策略，未设置时按错误码查表。
///
/// # 契约说明（What）
/// - 构造后可安全跨线程移动（`Send + Sync + 'static`）；
/// - `Display` 输出格式固定为 `[code] message`。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
    category: Option<ErrorCategory>,
}

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 统一的返回值别名，错误类型默认为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;

impl CoreError {
    /// 构造核心错误。
    ///
    /// ```rust
    /// use quire_core::CoreError;
    /// use quire_core::error::codes;
    ///
    /// let err = CoreError::new(codes::SINK_WRITE_FAILED, "socket closed");
    /// assert_eq!(err.code(), codes::SINK_WRITE_FAILED);
    /// assert_eq!(err.message(), "socket closed");
    /// assert!(err.cause().is_none());
    /// ```
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            category: None,
        }
    }

    /// 附带底层原因并返回新的核心错误。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 覆盖错误分类，优先级高于按错误码查表的默认值。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// 获取结构化错误分类。
    ///
    /// 显式设置的分类优先；否则按错误码映射，未登记的错误码回退为
    /// [`ErrorCategory::NonRetryable`]。
    pub fn category(&self) -> ErrorCategory {
        self.category
            .clone()
            .unwrap_or_else(|| default_category(self.code))
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// 便捷构造：调用方传参错误。
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(codes::APP_INVALID_ARGUMENT, message)
    }

    /// 便捷构造：页池无法提供页。
    pub fn allocation_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(codes::BUFFER_ALLOCATION_FAILED, message)
    }

    /// 是否为页池耗尽类错误。
    pub fn is_allocation_failure(&self) -> bool {
        self.code == codes::BUFFER_ALLOCATION_FAILED
    }

    /// 是否由取消导致。
    pub fn is_cancelled(&self) -> bool {
        matches!(self.category(), ErrorCategory::Cancelled)
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

/// 错误分类枚举，驱动调用方的处置策略。
///
/// - `Retryable`：携带退避建议 [`RetryAdvice`]；
/// - `ResourceExhausted`：页池耗尽，调用方应释放资源或降级；
/// - `InvalidArgument`：调用方传参错误，重试无意义；
/// - `Cancelled`/`Timeout`：由下游取消或超时引起，缓冲状态保持一致，可在条件恢复后重新刷新。
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    Retryable(RetryAdvice),
    NonRetryable,
    ResourceExhausted,
    InvalidArgument,
    Cancelled,
    Timeout,
}

/// 重试建议：推荐的等待时长与可选原因。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryAdvice {
    /// 推荐的等待时长。
    pub wait: Duration,
    /// 可选的原因描述，帮助调用方生成观测日志。
    pub reason: Option<Cow<'static, str>>,
}

impl RetryAdvice {
    /// 构造一个仅包含等待时间的建议。
    pub const fn after(wait: Duration) -> Self {
        Self { wait, reason: None }
    }

    /// 为建议附加原因描述。
    pub fn with_reason(mut self, reason: impl Into<Cow<'static, str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

fn default_category(code: &str) -> ErrorCategory {
    match code {
        codes::BUFFER_ALLOCATION_FAILED => ErrorCategory::ResourceExhausted,
        codes::APP_INVALID_ARGUMENT | codes::BUFFER_FOREIGN_PAGE => ErrorCategory::InvalidArgument,
        codes::SINK_CANCELLED => ErrorCategory::Cancelled,
        codes::SINK_TIMEOUT => ErrorCategory::Timeout,
        _ => ErrorCategory::NonRetryable,
    }
}

/// 内置错误码常量集合，遵循 `<领域>.<语义>` 命名约定。
pub mod codes {
    /// 页池无法提供页（耗尽或分配失败）。
    pub const BUFFER_ALLOCATION_FAILED: &str = "buffer.allocation_failed";
    /// 页池返回的页容量小于请求值。
    pub const BUFFER_PAGE_TOO_SMALL: &str = "buffer.page_too_small";
    /// 页归还失败。
    pub const BUFFER_RELEASE_FAILED: &str = "buffer.release_failed";
    /// 归还了不属于该页池的页。
    pub const BUFFER_FOREIGN_PAGE: &str = "buffer.foreign_page";
    /// Sink 写入失败。
    pub const SINK_WRITE_FAILED: &str = "sink.write_failed";
    /// Sink 写入被取消。
    pub const SINK_CANCELLED: &str = "sink.cancelled";
    /// Sink 写入超时。
    pub const SINK_TIMEOUT: &str = "sink.timeout";
    /// 调用方传参错误。
    pub const APP_INVALID_ARGUMENT: &str = "app.invalid_argument";
}
