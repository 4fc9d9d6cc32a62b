use serde::Deserialize;
use anyhow::Result;
use dotenvy::dotenv;
use std::path::PathBuf;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub max_file_size: usize,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_default().join("uploads"));

        std::fs::create_dir_all(&upload_dir)
            .map_err(|e| anyhow::anyhow!("Failed to create upload dir {}: {}", upload_dir.display(), e))?;

        let max_file_size = std::env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_file_size);

        Ok(Config {
            max_file_size,
            upload_dir,
        })
    }
}
