use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CoreReason {
    #[error("rule decode error")]
    RuleDecode,
    #[error("window eviction error")]
    Eviction,
    #[error("field extraction error")]
    FieldExtract,
    #[error("alert sink error")]
    AlertSink,
    #[error("data format error")]
    DataFormat,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::RuleDecode => 1001,
            Self::Eviction => 1002,
            Self::FieldExtract => 1003,
            Self::AlertSink => 1004,
            Self::DataFormat => 1005,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;
