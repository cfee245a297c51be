use super::{DocRef, UploadGateway};
use crate::db::queries;
use crate::error::UploadError;
use crate::models::UploadRecord;
use crate::service::{ExtractionService, InvoiceService};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// 进程内网关: 控制器直接绑定服务层
pub struct ServiceGateway {
    extractor: Arc<ExtractionService>,
    creator: Arc<InvoiceService>,
    pool: PgPool,
}

impl ServiceGateway {
    pub fn new(
        extractor: Arc<ExtractionService>,
        creator: Arc<InvoiceService>,
        pool: PgPool,
    ) -> Self {
        Self {
            extractor,
            creator,
            pool,
        }
    }
}

#[async_trait]
impl UploadGateway for ServiceGateway {
    async fn create_invoice(&self, docname: &str) -> Result<Option<DocRef>, UploadError> {
        let created = self.creator.create_invoice(docname, false).await?;
        Ok(Some(DocRef {
            doctype: created.doctype,
            name: created.name,
        }))
    }

    async fn extract(&self, docname: &str) -> Result<(), UploadError> {
        self.extractor.extract(docname).await?;
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<UploadRecord, UploadError> {
        queries::get_upload(&self.pool, name)
            .await?
            .ok_or_else(|| UploadError::NotFound(name.to_string()))
    }
}
