pub mod api;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod models;
pub mod ocr;
pub mod service;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::UploadError;
pub use service::{ExtractionService, InvoiceService};
