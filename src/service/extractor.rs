use crate::config::OcrConfig;
use crate::db::queries;
use crate::error::UploadError;
use crate::models::{CatalogEntry, ExtractedData, ExtractedItem, OcrStatus, UploadItem, UploadRecord};
use crate::ocr::OcrRunner;
use crate::service::matcher::FuzzyMatcher;
use crate::service::parser::{prefix_chars, InvoiceTextParser};
use indexmap::IndexSet;
use serde::Serialize;
use sqlx::PgPool;
use std::path::{Path, PathBuf};

/// 提取RPC的返回摘要
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub items: Vec<ExtractedItem>,
    pub party: Option<String>,
}

/// OCR提取服务: 识别 -> 解析 -> 匹配 -> 落库
/// 状态机推进也在这里: Processing 进入, Extracted / Failed 退出
pub struct ExtractionService {
    pool: PgPool,
    ocr: OcrRunner,
    parser: InvoiceTextParser,
    matcher: FuzzyMatcher,
    files_dir: PathBuf,
}

impl ExtractionService {
    pub fn new(pool: PgPool, config: &OcrConfig) -> Self {
        Self {
            pool,
            ocr: OcrRunner::new(config),
            parser: InvoiceTextParser::new(),
            matcher: FuzzyMatcher::new(),
            files_dir: PathBuf::from(&config.files_dir),
        }
    }

    /// 提取入口: 流水线任何阶段失败都把状态置为 Failed 再返回错误
    pub async fn extract(&self, docname: &str) -> Result<ExtractionSummary, UploadError> {
        let record = queries::get_upload(&self.pool, docname)
            .await?
            .ok_or_else(|| UploadError::NotFound(docname.to_string()))?;

        match self.run_pipeline(&record).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::error!("OCR提取失败 {}: {}", docname, e);
                if let Err(mark_err) =
                    queries::set_ocr_status(&self.pool, docname, OcrStatus::Failed.as_str()).await
                {
                    tracing::error!("Failed to mark {} as Failed: {}", docname, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, record: &UploadRecord) -> Result<ExtractionSummary, UploadError> {
        // Phase 1: 文件检查
        let file = record
            .file
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| UploadError::NoFile(record.name.clone()))?;
        let path = self.resolve_file(file);

        // Phase 2: 进入 Processing 并立即落库, 客户端刷新即可看到
        queries::set_ocr_status(&self.pool, &record.name, OcrStatus::Processing.as_str()).await?;

        // Phase 3: OCR识别, 原文截断保存供人工复核
        let text = self.ocr.extract_text(&path).await?;
        queries::save_raw_text(&self.pool, &record.name, prefix_chars(&text, 10_000)).await?;

        // Phase 4: 解析明细, 去重后逐行匹配商品档案
        let raw_items = self.parser.extract_items(&text);
        tracing::info!("单据 {} 解析出 {} 行明细", record.name, raw_items.len());

        let catalog = CatalogEntry::expand(&queries::list_active_items(&self.pool).await?);
        let rows = build_rows(&self.parser, &self.matcher, &record.name, &raw_items, &catalog);
        let matched = rows.iter().filter(|r| r.item.is_some()).count();
        tracing::info!(
            "单据 {} 去重后 {} 行, 匹配到商品 {} 行",
            record.name,
            rows.len(),
            matched
        );
        queries::replace_upload_items(&self.pool, &record.name, &rows).await?;

        // Phase 5: 往来单位模糊匹配, 未命中保留OCR原文名称
        let parties = queries::list_parties(&self.pool, &record.party_type).await?;
        let party = self.parser.extract_party(&text).map(|raw| {
            match self.matcher.match_party(&raw, &parties) {
                Some(found) => found.name,
                None => raw,
            }
        });

        // Phase 6: 写入提取结果并置状态为 Extracted
        let data = ExtractedData {
            invoice_no: self
                .parser
                .extract_keyword(&text, &["Invoice#", "Invoice No", "Invoice Number"]),
            date: self.parser.extract_keyword(&text, &["Date"]),
            total: self.parser.extract_keyword(&text, &["Total", "Amount Due"]),
            items: raw_items,
            party: party.clone(),
        };
        queries::finish_extraction(&self.pool, &record.name, &serde_json::to_string_pretty(&data)?)
            .await?;

        tracing::info!("单据 {} OCR提取完成", record.name);
        Ok(ExtractionSummary {
            items: data.items,
            party,
        })
    }

    /// OCR调试预览: 只识别并保存原文, 不做解析
    pub async fn ocr_preview(&self, docname: &str) -> Result<String, UploadError> {
        let record = queries::get_upload(&self.pool, docname)
            .await?
            .ok_or_else(|| UploadError::NotFound(docname.to_string()))?;
        let file = record
            .file
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| UploadError::NoFile(record.name.clone()))?;

        let text = self.ocr.extract_text(&self.resolve_file(file)).await?;
        queries::save_raw_text(&self.pool, &record.name, prefix_chars(&text, 10_000)).await?;

        Ok(prefix_chars(&text, 5_000).to_string())
    }

    fn resolve_file(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.files_dir.join(path)
        }
    }
}

/// 去重并逐行匹配, 生成上传单据子表行
/// 去重键为规整后的描述, 保留首次出现顺序
fn build_rows(
    parser: &InvoiceTextParser,
    matcher: &FuzzyMatcher,
    parent: &str,
    items: &[ExtractedItem],
    catalog: &[CatalogEntry],
) -> Vec<UploadItem> {
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut rows = Vec::new();

    for item in items {
        if item.description.len() < 3 {
            continue;
        }
        if !seen.insert(parser.normalize_description(&item.description)) {
            continue;
        }

        let matched = match_description(matcher, &item.description, catalog);
        rows.push(UploadItem {
            parent: parent.to_string(),
            idx: rows.len() as i32 + 1,
            ocr_description: item.description.clone(),
            qty: item.qty.clone(),
            rate: item.rate.clone(),
            item: matched,
        });
    }

    rows
}

/// 先按方括号编码以高阈值匹配, 未命中再用整行描述
fn match_description(
    matcher: &FuzzyMatcher,
    description: &str,
    catalog: &[CatalogEntry],
) -> Option<String> {
    if let Some(bracket) = matcher.extract_bracket_text(description) {
        if let Some(found) = matcher.match_item(bracket, catalog) {
            if found.score > 85.0 {
                return Some(found.item_code);
            }
        }
    }

    matcher
        .match_item(description, catalog)
        .filter(|found| found.score > 75.0)
        .map(|found| found.item_code)
}
