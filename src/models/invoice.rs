use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 生成的发票主表
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub name: String,
    pub invoice_type: String,           // "Sales Invoice" / "Purchase Invoice"
    pub party: String,
    pub bill_no: Option<String>,        // 采购发票: 上传单据name
    pub bill_date: Option<NaiveDate>,
    pub posting_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,                 // Draft / Submitted
    pub total: BigDecimal,
}

/// 发票明细行
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub parent: String,
    pub idx: i32,
    pub item_code: String,
    pub item_name: String,
    pub description: String,
    pub qty: BigDecimal,
    pub rate: BigDecimal,
    pub amount: BigDecimal,
    pub uom: String,
    pub account: String,                // 费用/收入科目
}

/// 创建发票RPC的返回引用: 客户端据此跳转
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedInvoice {
    pub doctype: String,
    pub name: String,
    pub status: String,
}
