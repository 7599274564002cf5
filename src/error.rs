//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载卡片链路中的所有错误来源（数据流、解码、网络、文件），
//! 避免字符串拼接式错误处理。通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! ## 实现思路
//!
//! - 各分支携带已格式化的上下文字符串，因此类型可 `Clone`，
//!   转换处理器可以缓存一次解码的失败结果并在后续调用中原样返回。
//! - “没有卡片数据”不是错误：它体现为空的 `raw_chara_data` 与 `Revision::NONE`，
//!   调用方据此区分“处理失败”与“图片可用但无卡片”。

/// 卡片处理统一错误类型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    /// 数据流截断或底层 I/O 失败，扫描立即中止。
    #[error("数据流错误：{0}")]
    Stream(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("网络错误：{0}")]
    Network(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl From<std::io::Error> for CardError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            return CardError::Stream(format!("数据意外结束：{}", error));
        }
        CardError::Stream(error.to_string())
    }
}

impl From<CardError> for String {
    fn from(error: CardError) -> Self {
        error.to_string()
    }
}
