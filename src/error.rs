use thiserror::Error;

/// 业务错误: RPC层统一映射为 {success:false, message}
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload {0} not found")]
    NotFound(String),

    #[error("No file attached to upload {0}")]
    NoFile(String),

    #[error("No OCR data extracted for upload {0}")]
    NoExtractedData(String),

    #[error("Party is missing. Cannot create invoice.")]
    PartyMissing,

    #[error("Party '{0}' not found in the system. Please create it first.")]
    PartyNotFound(String),

    #[error("Invoice already created for upload {0}")]
    AlreadyCreated(String),

    #[error("No valid items found to create invoice")]
    NoMatchedItems,

    #[error("No default {account_type} account found for company {company}")]
    NoDefaultAccount {
        account_type: &'static str,
        company: String,
    },

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UploadError {
    /// 未找到单据与其他错误在RPC层区分状态码
    pub fn is_not_found(&self) -> bool {
        matches!(self, UploadError::NotFound(_))
    }
}
