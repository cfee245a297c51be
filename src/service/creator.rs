use crate::config::CompanyConfig;
use crate::db::queries;
use crate::error::UploadError;
use crate::models::{
    CreatedInvoice, ExtractedData, Invoice, InvoiceItem, PartyType, UploadRecord,
};
use crate::service::matcher::FuzzyMatcher;
use bigdecimal::{BigDecimal, Zero};
use chrono::{Duration, Utc};
use sqlx::PgPool;

/// 发票创建服务: 上传单据 -> 销售/采购发票
pub struct InvoiceService {
    pool: PgPool,
    matcher: FuzzyMatcher,
    default_company: String,
}

impl InvoiceService {
    pub fn new(pool: PgPool, config: &CompanyConfig) -> Self {
        Self {
            pool,
            matcher: FuzzyMatcher::new(),
            default_company: config.default_company.clone(),
        }
    }

    /// 创建发票, 默认草稿
    pub async fn create_invoice(
        &self,
        docname: &str,
        submit_invoice: bool,
    ) -> Result<CreatedInvoice, UploadError> {
        // 1. 查询上传单据
        let record = queries::get_upload(&self.pool, docname)
            .await?
            .ok_or_else(|| UploadError::NotFound(docname.to_string()))?;

        // 2. 重复创建检查
        if record.invoice_created {
            return Err(UploadError::AlreadyCreated(docname.to_string()));
        }

        // 3. 确认往来单位存在
        let party = self.ensure_party(&record).await?;

        // 4. 按往来单位类型决定发票类型与记账科目
        let party_type = record.party_type();
        let (invoice_type, sequence, prefix) = match party_type {
            PartyType::Supplier => ("Purchase Invoice", "purchase_invoice_name_seq", "PINV"),
            PartyType::Customer => ("Sales Invoice", "sales_invoice_name_seq", "SINV"),
        };
        let account = self.resolve_account(party_type).await?;

        // 5. 子表行转发票明细, 未匹配行跳过
        let upload_items = queries::list_upload_items(&self.pool, &record.name).await?;
        let mut items: Vec<InvoiceItem> = Vec::new();
        for row in upload_items {
            let Some(item_code) = row.item else {
                tracing::warn!("跳过未匹配明细行: {}", row.ocr_description);
                continue;
            };
            let Some(item_doc) = queries::get_item(&self.pool, &item_code).await? else {
                tracing::warn!("商品档案缺失 {}, 跳过", item_code);
                continue;
            };

            let amount = &row.qty * &row.rate;
            items.push(InvoiceItem {
                parent: String::new(), // 发票编号生成后回填
                idx: items.len() as i32 + 1,
                item_code: item_doc.item_code,
                item_name: item_doc.item_name,
                description: item_doc
                    .description
                    .unwrap_or_else(|| row.ocr_description.clone()),
                qty: row.qty,
                rate: row.rate,
                amount,
                uom: item_doc.stock_uom.unwrap_or_else(|| "Nos".to_string()),
                account: account.clone(),
            });
        }

        if items.is_empty() {
            return Err(UploadError::NoMatchedItems);
        }

        // 6. 日期与合计
        let posting_date = record
            .posting_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let due_date = posting_date + Duration::days(30);
        let total = items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + &item.amount);

        // 7. 取发票编号并组装
        let name = queries::next_invoice_name(&self.pool, sequence, prefix).await?;
        for item in items.iter_mut() {
            item.parent = name.clone();
        }
        let status = if submit_invoice { "Submitted" } else { "Draft" };
        let invoice = Invoice {
            name: name.clone(),
            invoice_type: invoice_type.to_string(),
            party: party.clone(),
            bill_no: (party_type == PartyType::Supplier).then(|| record.name.clone()),
            bill_date: match party_type {
                PartyType::Supplier => record.invoice_date,
                PartyType::Customer => None,
            },
            posting_date,
            due_date,
            status: status.to_string(),
            total,
        };

        // 8. 事务写入: 发票 + 明细 + 回写上传单据
        let mut tx = self.pool.begin().await?;
        queries::insert_invoice(&mut tx, &invoice).await?;
        queries::insert_invoice_items(&mut tx, &items).await?;
        queries::mark_invoice_created(&mut tx, &record.name, &party, &name, invoice_type, status)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "发票 {} 已创建 ({}), 共 {} 行, 合计 {}",
            name,
            status,
            items.len(),
            invoice.total
        );

        Ok(CreatedInvoice {
            doctype: invoice_type.to_string(),
            name,
            status: status.to_string(),
        })
    }

    /// 确认往来单位: 精确存在 -> 模糊匹配重试 -> 报错
    async fn ensure_party(&self, record: &UploadRecord) -> Result<String, UploadError> {
        let raw = record
            .extracted_data
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| UploadError::NoExtractedData(record.name.clone()))?;
        let data: ExtractedData = serde_json::from_str(raw)?;
        let party = data.party.unwrap_or_default();
        let party = party.trim();

        if party.is_empty() {
            return Err(UploadError::PartyMissing);
        }

        if queries::party_exists(&self.pool, &record.party_type, party).await? {
            return Ok(party.to_string());
        }

        // 提取后档案可能有更新, 再做一轮模糊匹配
        let parties = queries::list_parties(&self.pool, &record.party_type).await?;
        if let Some(found) = self.matcher.match_party(party, &parties) {
            return Ok(found.name);
        }

        Err(UploadError::PartyNotFound(party.to_string()))
    }

    /// 记账科目: 公司默认科目, 否则第一个非汇总的同类科目
    async fn resolve_account(&self, party_type: PartyType) -> Result<String, UploadError> {
        let company = &self.default_company;
        let (default_account, account_type) = match party_type {
            PartyType::Supplier => (
                queries::company_default_expense_account(&self.pool, company).await?,
                "Expense",
            ),
            PartyType::Customer => (
                queries::company_default_income_account(&self.pool, company).await?,
                "Income",
            ),
        };

        if let Some(account) = default_account {
            return Ok(account);
        }

        queries::first_leaf_account(&self.pool, account_type, company)
            .await?
            .ok_or_else(|| UploadError::NoDefaultAccount {
                account_type,
                company: company.clone(),
            })
    }
}
