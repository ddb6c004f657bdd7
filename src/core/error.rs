use thiserror::Error;

/// 内容列表错误类型
#[derive(Error, Debug)]
pub enum ListerError {
    #[error("内容存储不可用: {message}")]
    StoreUnavailable {
        message: String,
    },

    #[error("无效的查询: {message}")]
    InvalidQuery {
        message: String,
    },

    #[error("字段解析失败: 条目 {item_id} 没有字段 {field}")]
    FieldResolutionMiss {
        item_id: u64,
        field: String,
    },

    #[error("视图渲染失败: {content_type} - {message}")]
    Render {
        content_type: String,
        message: String,
    },
}

impl ListerError {
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        ListerError::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        ListerError::InvalidQuery {
            message: message.into(),
        }
    }

    /// 是否会中止当前渲染过程
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ListerError::FieldResolutionMiss { .. })
    }
}

pub type ListerResult<T> = std::result::Result<T, ListerError>;
