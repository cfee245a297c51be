use crate::config::OcrConfig;
use crate::error::UploadError;
use image::imageops::FilterType;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// OCR引擎: 封装 tesseract / pdftoppm 子进程
/// PDF先逐页栅格化再识别, 图片直接识别
pub struct OcrRunner {
    languages: String,
    dpi: u32,
}

impl OcrRunner {
    pub fn new(config: &OcrConfig) -> Self {
        let languages = if config.languages.is_empty() {
            "eng".to_string()
        } else {
            config.languages.clone()
        };
        Self {
            languages,
            dpi: config.dpi,
        }
    }

    /// 识别整个文件, 返回拼接后的全文
    pub async fn extract_text(&self, path: &Path) -> Result<String, UploadError> {
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            self.ocr_pdf(path).await
        } else {
            self.ocr_image(path).await
        }
    }

    async fn ocr_pdf(&self, path: &Path) -> Result<String, UploadError> {
        let scratch = tempfile::TempDir::with_prefix("invoice-ocr")?;
        let page_prefix = scratch.path().join("page");

        // PDF -> PNG 逐页栅格化
        let output = Command::new("pdftoppm")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(path)
            .arg(&page_prefix)
            .output()
            .await?;
        check_for_command_failure("pdftoppm", &output)?;

        let mut pages: Vec<PathBuf> = std::fs::read_dir(scratch.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
            .collect();
        pages.sort();

        if pages.is_empty() {
            return Err(UploadError::Ocr(format!(
                "pdftoppm produced no pages for {}",
                path.display()
            )));
        }

        tracing::info!("OCR识别PDF {} 共 {} 页", path.display(), pages.len());

        let mut text = String::new();
        for page in &pages {
            text.push_str(&self.ocr_page(page, scratch.path()).await?);
        }
        Ok(text)
    }

    async fn ocr_image(&self, path: &Path) -> Result<String, UploadError> {
        let scratch = tempfile::TempDir::with_prefix("invoice-ocr")?;
        self.ocr_page(path, scratch.path()).await
    }

    /// 单页识别: 预处理后交给 tesseract, 读取其输出文件
    async fn ocr_page(&self, image_path: &Path, scratch: &Path) -> Result<String, UploadError> {
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "page".to_string());

        let processed = preprocess(image_path)?;
        let input_path = scratch.join(format!("{}-proc.png", stem));
        processed
            .save(&input_path)
            .map_err(|e| UploadError::Ocr(format!("cannot write processed page: {}", e)))?;

        let out_base = scratch.join(format!("{}-out", stem));
        let output = Command::new("tesseract")
            .arg(&input_path)
            .arg(&out_base)
            .args(["--psm", "4", "--oem", "3", "-l", &self.languages])
            .output()
            .await?;
        check_for_command_failure("tesseract", &output)?;

        Ok(std::fs::read_to_string(out_base.with_extension("txt"))?)
    }
}

fn check_for_command_failure(name: &str, output: &Output) -> Result<(), UploadError> {
    if output.status.success() {
        Ok(())
    } else {
        Err(UploadError::Ocr(format!(
            "{} failed: {}",
            name,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// 识别前预处理: 灰度 -> 2倍放大 -> 对比度拉伸 -> 均值二值化
fn preprocess(path: &Path) -> Result<GrayImage, UploadError> {
    let img = image::open(path)
        .map_err(|e| UploadError::Ocr(format!("cannot load {}: {}", path.display(), e)))?;
    let gray = img.to_luma8();
    Ok(binarize(&stretch_contrast(&upscale(&gray))))
}

fn upscale(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    image::imageops::resize(gray, w * 2, h * 2, FilterType::CatmullRom)
}

/// 线性拉伸到整个灰度区间
fn stretch_contrast(gray: &GrayImage) -> GrayImage {
    let (min, max) = gray
        .pixels()
        .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return gray.clone();
    }
    let range = (max - min) as u32;

    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = (((p[0] - min) as u32 * 255) / range) as u8;
    }
    out
}

/// 以全图均值为阈值二值化
fn binarize(gray: &GrayImage) -> GrayImage {
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    let count = (gray.width() as u64 * gray.height() as u64).max(1);
    let mean = (sum / count) as u8;

    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = if p[0] > mean { 255 } else { 0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(values: &[u8]) -> GrayImage {
        let mut img = GrayImage::new(values.len() as u32, 1);
        for (x, v) in values.iter().enumerate() {
            img.put_pixel(x as u32, 0, Luma([*v]));
        }
        img
    }

    #[test]
    fn stretch_expands_narrow_range() {
        let out = stretch_contrast(&gradient(&[100, 150, 200]));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn stretch_leaves_flat_image_alone() {
        let out = stretch_contrast(&gradient(&[128, 128]));
        assert_eq!(out.get_pixel(0, 0)[0], 128);
        assert_eq!(out.get_pixel(1, 0)[0], 128);
    }

    #[test]
    fn binarize_splits_on_mean() {
        let out = binarize(&gradient(&[0, 0, 255, 255]));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn upscale_doubles_dimensions() {
        let out = upscale(&GrayImage::new(3, 5));
        assert_eq!(out.dimensions(), (6, 10));
    }

    #[test]
    fn runner_defaults_language_when_empty() {
        let config = crate::config::OcrConfig {
            languages: String::new(),
            dpi: 300,
            files_dir: ".".to_string(),
        };
        let runner = OcrRunner::new(&config);
        assert_eq!(runner.languages, "eng");
    }
}
