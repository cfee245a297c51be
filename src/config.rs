use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ocr: OcrConfig,
    pub company: CompanyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// OCR引擎配置: tesseract语言包与PDF栅格化精度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub languages: String,
    pub dpi: u32,
    pub files_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub default_company: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/invoice_ocr".to_string(),
            },
            ocr: OcrConfig {
                languages: "eng".to_string(),
                dpi: 300,
                files_dir: "./files".to_string(),
            },
            company: CompanyConfig {
                default_company: "Default Company".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            ocr: OcrConfig {
                languages: std::env::var("OCR_LANGUAGES").unwrap_or(defaults.ocr.languages),
                dpi: std::env::var("OCR_DPI")
                    .ok()
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(defaults.ocr.dpi),
                files_dir: std::env::var("FILES_DIR").unwrap_or(defaults.ocr.files_dir),
            },
            company: CompanyConfig {
                default_company: std::env::var("DEFAULT_COMPANY")
                    .unwrap_or(defaults.company.default_company),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ocr.languages, "eng");
        assert_eq!(config.ocr.dpi, 300);
        assert!(config.database.url.starts_with("postgres://"));
    }
}
