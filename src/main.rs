use axum::{routing::{get, post}, Router};
use invoice_ocr_rust::{api, create_pool, AppConfig, ExtractionService, InvoiceService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    // 两个RPC服务: OCR提取 + 发票创建
    let extraction_service = Arc::new(ExtractionService::new(pool.clone(), &config.ocr));
    let invoice_service = Arc::new(InvoiceService::new(pool.clone(), &config.company));

    // 提取相关路由
    let extract_routes = Router::new()
        .route("/api/upload/extract", post(api::extract_invoice))
        .route("/api/upload/:name/ocr-preview", get(api::ocr_preview))
        .with_state(extraction_service);

    // 创建发票路由
    let create_routes = Router::new()
        .route("/api/upload/create-invoice", post(api::create_invoice))
        .with_state(invoice_service);

    // 单据查询与导出路由
    let record_routes = Router::new()
        .route("/api/upload/:name", get(api::get_upload))
        .route("/api/upload/:name/items.csv", get(api::export_items_csv))
        .with_state(pool);

    // 合并路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(extract_routes)
        .merge(create_routes)
        .merge(record_routes)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/upload/extract            - OCR提取");
    info!("  POST /api/upload/create-invoice     - 创建发票");
    info!("  GET  /api/upload/:name              - 单据查询");
    info!("  GET  /api/upload/:name/items.csv    - 明细复核导出");
    info!("  GET  /api/upload/:name/ocr-preview  - OCR调试预览");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
