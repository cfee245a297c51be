use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// OCR解析出的单行明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub description: String,
    pub qty: BigDecimal,
    pub rate: BigDecimal,
}

/// 提取结果JSON (持久化到 invoice_upload.extracted_data)
/// 历史数据可能缺字段, 反序列化时全部取默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedData {
    pub invoice_no: Option<String>,
    pub date: Option<String>,
    pub total: Option<String>,
    pub items: Vec<ExtractedItem>,
    pub party: Option<String>,
}
