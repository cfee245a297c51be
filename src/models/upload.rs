use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// OCR状态机: Pending -> Processing -> Extracted | Failed
/// 状态只由服务端提取流程推进, 客户端只读+刷新
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcrStatus {
    Pending,
    Processing,
    Extracted,
    Failed,
}

impl OcrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrStatus::Pending => "Pending",
            OcrStatus::Processing => "Processing",
            OcrStatus::Extracted => "Extracted",
            OcrStatus::Failed => "Failed",
        }
    }

    /// 数据库中以文本存储, 未知取值按 None 处理
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OcrStatus::Pending),
            "Processing" => Some(OcrStatus::Processing),
            "Extracted" => Some(OcrStatus::Extracted),
            "Failed" => Some(OcrStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 往来单位类型: 供应商走采购发票, 其余走销售发票
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyType {
    Customer,
    Supplier,
}

impl PartyType {
    pub fn from_field(s: &str) -> Self {
        if s == "Supplier" {
            PartyType::Supplier
        } else {
            PartyType::Customer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::Customer => "Customer",
            PartyType::Supplier => "Supplier",
        }
    }
}

/// 上传单据主表 (InvoiceUpload)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UploadRecord {
    pub name: String,
    pub file: Option<String>,           // 上传文件路径
    pub party_type: String,             // Customer / Supplier
    pub party: Option<String>,
    pub invoice_date: Option<NaiveDate>,   // 票面日期
    pub posting_date: Option<NaiveDate>,   // 过账日期 (可选覆盖)
    pub ocr_status: String,
    pub raw_ocr_text: Option<String>,
    pub extracted_data: Option<String>, // 提取结果JSON
    pub invoice_created: bool,
    pub invoice_reference: Option<String>,
    pub invoice_type: Option<String>,
    pub invoice_status: Option<String>,
}

impl UploadRecord {
    /// 提取完成判定: 必须与 "Extracted" 精确相等,
    /// 其他任何字符串(包括空串)都视为未提取
    pub fn is_extracted(&self) -> bool {
        self.ocr_status == OcrStatus::Extracted.as_str()
    }

    pub fn party_type(&self) -> PartyType {
        PartyType::from_field(&self.party_type)
    }
}

/// 上传单据明细表 (InvoiceUploadItem)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UploadItem {
    pub parent: String,                 // 关联单据name
    pub idx: i32,                       // 行号
    pub ocr_description: String,        // OCR原始描述
    pub qty: BigDecimal,
    pub rate: BigDecimal,
    pub item: Option<String>,           // 匹配到的商品编码
}
