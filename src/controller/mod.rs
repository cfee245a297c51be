//! 客户端控制器层: 原表单脚本的显式化版本
//! 不依赖全局事件注册, 控制器持有网关句柄与当前视图

pub mod form;
pub mod gateway;
pub mod trigger;

pub use form::{CreateOutcome, UploadFormController};
pub use gateway::ServiceGateway;
pub use trigger::ExtractionTriggerController;

use crate::error::UploadError;
use crate::models::UploadRecord;
use async_trait::async_trait;

/// 目标单据引用: 创建RPC的返回, 客户端据此跳转
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    pub doctype: String,
    pub name: String,
}

/// 客户端路由: "{doctype}/{name}"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route(String);

impl Route {
    pub fn form(doc: &DocRef) -> Self {
        Route(format!("{}/{}", doc.doctype, doc.name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 后端网关: 控制器唯一的外部依赖
/// 两个远程过程 + 单据重载, 成功/失败都是显式结果
#[async_trait]
pub trait UploadGateway: Send + Sync {
    /// 创建发票, None 表示服务端未创建任何单据
    async fn create_invoice(&self, docname: &str) -> Result<Option<DocRef>, UploadError>;

    /// 触发OCR提取
    async fn extract(&self, docname: &str) -> Result<(), UploadError>;

    /// 重新加载单据
    async fn load(&self, name: &str) -> Result<UploadRecord, UploadError>;
}

/// 表单视图句柄: 当前单据 + 新建标记 + 当前路由
#[derive(Debug, Clone)]
pub struct FormView {
    pub record: UploadRecord,
    pub is_new: bool,
    route: Option<Route>,
}

impl FormView {
    /// 已保存单据的视图
    pub fn opened(record: UploadRecord) -> Self {
        Self {
            record,
            is_new: false,
            route: None,
        }
    }

    /// 尚未保存的新建单据视图
    pub fn unsaved(record: UploadRecord) -> Self {
        Self {
            record,
            is_new: true,
            route: None,
        }
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn navigate(&mut self, route: Route) {
        self.route = Some(route);
    }
}
