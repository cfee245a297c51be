use super::{FormView, UploadGateway};
use crate::error::UploadError;
use std::sync::Arc;

/// 提取触发控制器: 表单展示时决定是否提供提取动作,
/// 动作执行后重新加载当前单据
pub struct ExtractionTriggerController {
    gateway: Arc<dyn UploadGateway>,
}

impl ExtractionTriggerController {
    pub fn new(gateway: Arc<dyn UploadGateway>) -> Self {
        Self { gateway }
    }

    /// 是否提供提取按钮: 非新建 且 状态不精确等于 "Extracted"
    pub fn offers_extraction(view: &FormView) -> bool {
        !view.is_new && !view.record.is_extracted()
    }

    /// 执行提取: 远程调用成功后重新加载一次当前单据
    /// 调用失败不触发重载
    pub async fn run(&self, view: &mut FormView) -> Result<(), UploadError> {
        self.gateway.extract(&view.record.name).await?;
        view.record = self.gateway.load(&view.record.name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{record, MockGateway};
    use std::sync::atomic::Ordering;

    #[test]
    fn offered_only_for_saved_unextracted_records() {
        // 已保存且未提取: 提供
        assert!(ExtractionTriggerController::offers_extraction(
            &FormView::opened(record("U-1", "Pending"))
        ));
        // 新建单据: 不提供
        assert!(!ExtractionTriggerController::offers_extraction(
            &FormView::unsaved(record("U-1", "Pending"))
        ));
        // 已提取: 不提供
        assert!(!ExtractionTriggerController::offers_extraction(
            &FormView::opened(record("U-1", "Extracted"))
        ));
    }

    #[test]
    fn extracted_check_is_exact_string_match() {
        // 只有精确的 "Extracted" 会隐藏按钮
        for status in ["", "extracted", "EXTRACTED", "Extracted ", "Processing", "Failed", "weird"] {
            assert!(
                ExtractionTriggerController::offers_extraction(&FormView::opened(record(
                    "U-1", status
                ))),
                "status {:?} should offer extraction",
                status
            );
        }
        assert!(!ExtractionTriggerController::offers_extraction(
            &FormView::opened(record("U-1", "Extracted"))
        ));
    }

    #[tokio::test]
    async fn run_reloads_exactly_once() {
        let gateway = Arc::new(MockGateway::new());
        let controller = ExtractionTriggerController::new(gateway.clone());
        let mut view = FormView::opened(record("U-1", "Pending"));

        controller.run(&mut view).await.unwrap();

        assert_eq!(gateway.extract_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.load_calls.load(Ordering::SeqCst), 1);
        // 重载后视图拿到最新状态
        assert_eq!(view.record.ocr_status, "Extracted");
    }

    #[tokio::test]
    async fn repeated_runs_issue_independent_calls() {
        let gateway = Arc::new(MockGateway {
            loaded_status: "Processing".to_string(),
            ..MockGateway::new()
        });
        let controller = ExtractionTriggerController::new(gateway.clone());
        let mut view = FormView::opened(record("U-1", "Pending"));

        controller.run(&mut view).await.unwrap();
        controller.run(&mut view).await.unwrap();

        assert_eq!(gateway.extract_calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.load_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_extract_does_not_reload() {
        let gateway = Arc::new(MockGateway {
            fail_extract: true,
            ..MockGateway::new()
        });
        let controller = ExtractionTriggerController::new(gateway.clone());
        let mut view = FormView::opened(record("U-1", "Pending"));

        let result = controller.run(&mut view).await;

        assert!(result.is_err());
        assert_eq!(gateway.extract_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.load_calls.load(Ordering::SeqCst), 0);
        // 视图仍然是原单据
        assert_eq!(view.record.ocr_status, "Pending");
    }
}
