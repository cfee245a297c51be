use super::{DocRef, FormView, Route, UploadGateway};
use crate::error::UploadError;
use std::sync::Arc;

/// 创建动作结果: 服务端未创建单据时显式返回, 不做静默no-op
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(DocRef),
    NothingCreated,
}

/// 上传表单控制器: 触发创建发票并跳转到新单据
pub struct UploadFormController {
    gateway: Arc<dyn UploadGateway>,
}

impl UploadFormController {
    pub fn new(gateway: Arc<dyn UploadGateway>) -> Self {
        Self { gateway }
    }

    /// 创建发票: 返回单据引用则跳转, 空结果保持视图不变
    pub async fn create_invoice(
        &self,
        view: &mut FormView,
    ) -> Result<CreateOutcome, UploadError> {
        match self.gateway.create_invoice(&view.record.name).await? {
            Some(doc) => {
                view.navigate(Route::form(&doc));
                Ok(CreateOutcome::Created(doc))
            }
            None => {
                tracing::warn!("创建发票返回空结果, 视图保持不变: {}", view.record.name);
                Ok(CreateOutcome::NothingCreated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{record, MockGateway};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn navigates_to_created_invoice() {
        let gateway = Arc::new(MockGateway::replying(DocRef {
            doctype: "Sales Invoice".to_string(),
            name: "SINV-0001".to_string(),
        }));
        let controller = UploadFormController::new(gateway.clone());
        let mut view = FormView::opened(record("INV-UPL-0001", "Extracted"));

        let outcome = controller.create_invoice(&mut view).await.unwrap();

        assert_eq!(
            outcome,
            CreateOutcome::Created(DocRef {
                doctype: "Sales Invoice".to_string(),
                name: "SINV-0001".to_string(),
            })
        );
        assert_eq!(view.route().map(|r| r.as_str()), Some("Sales Invoice/SINV-0001"));
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_reply_leaves_view_unchanged() {
        let gateway = Arc::new(MockGateway::new());
        let controller = UploadFormController::new(gateway.clone());
        let mut view = FormView::opened(record("INV-UPL-0001", "Extracted"));

        let outcome = controller.create_invoice(&mut view).await.unwrap();

        assert_eq!(outcome, CreateOutcome::NothingCreated);
        assert!(view.route().is_none());
        assert_eq!(view.record.name, "INV-UPL-0001");
    }

    #[tokio::test]
    async fn backend_error_is_surfaced() {
        let gateway = Arc::new(MockGateway {
            fail_create: true,
            ..MockGateway::new()
        });
        let controller = UploadFormController::new(gateway.clone());
        let mut view = FormView::opened(record("INV-UPL-0001", "Extracted"));

        let result = controller.create_invoice(&mut view).await;

        assert!(result.is_err());
        assert!(view.route().is_none());
    }
}
