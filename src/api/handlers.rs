use crate::db::queries;
use crate::error::UploadError;
use crate::models::{CreatedInvoice, ExtractedItem};
use crate::service::{ExtractionService, InvoiceService};
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

/// 请求体: OCR提取
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub docname: String,
}

/// 响应体: OCR提取
#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub message: String,
    pub items: Option<Vec<ExtractedItem>>,
    pub party: Option<String>,
}

/// 请求体: 创建发票
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub docname: String,
    #[serde(default)]
    pub submit_invoice: bool,
}

/// 响应体: 创建发票
#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
    pub success: bool,
    pub message: String,
    pub invoice: Option<CreatedInvoice>,
}

/// 通用错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

fn error_status(e: &UploadError) -> StatusCode {
    if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message,
        }),
    )
        .into_response()
}

/// OCR提取接口
pub async fn extract_invoice(
    State(service): State<Arc<ExtractionService>>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    match service.extract(&req.docname).await {
        Ok(summary) => {
            let response = ExtractResponse {
                success: true,
                message: format!(
                    "Extracted {} items from {}",
                    summary.items.len(),
                    req.docname
                ),
                items: Some(summary.items),
                party: summary.party,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let response = ExtractResponse {
                success: false,
                message: format!("Error: {}", e),
                items: None,
                party: None,
            };
            (error_status(&e), Json(response)).into_response()
        }
    }
}

/// 创建发票接口
pub async fn create_invoice(
    State(service): State<Arc<InvoiceService>>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Response {
    match service.create_invoice(&req.docname, req.submit_invoice).await {
        Ok(invoice) => {
            let response = CreateInvoiceResponse {
                success: true,
                message: format!("{} created ({})", invoice.name, invoice.status),
                invoice: Some(invoice),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let response = CreateInvoiceResponse {
                success: false,
                message: format!("Error: {}", e),
                invoice: None,
            };
            (error_status(&e), Json(response)).into_response()
        }
    }
}

/// 查询上传单据 (客户端刷新用)
pub async fn get_upload(State(pool): State<PgPool>, Path(name): Path<String>) -> Response {
    match queries::get_upload(&pool, &name).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Upload {} not found", name),
        ),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", e),
        ),
    }
}

/// 明细复核CSV下载
pub async fn export_items_csv(State(pool): State<PgPool>, Path(name): Path<String>) -> Response {
    let record = match queries::get_upload(&pool, &name).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("Upload {} not found", name),
            )
        }
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: {}", e),
            )
        }
    };

    let items = match queries::list_upload_items(&pool, &record.name).await {
        Ok(items) => items,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: {}", e),
            )
        }
    };

    match queries::export_items_csv(&items) {
        Ok(data) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            data,
        )
            .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", e),
        ),
    }
}

/// OCR调试预览: 返回识别原文前5000字符
pub async fn ocr_preview(
    State(service): State<Arc<ExtractionService>>,
    Path(name): Path<String>,
) -> Response {
    match service.ocr_preview(&name).await {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => error_response(error_status(&e), format!("Error: {}", e)),
    }
}
