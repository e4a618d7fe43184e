use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Destination for finished playlists
#[async_trait]
pub trait PlaylistSink: Send + Sync {
    /// Persist `urls` (already ordered and deduplicated) as the playlist for
    /// `category`. Returns where it went.
    async fn write(&self, category: &str, urls: &[String], base_name: &str) -> Result<PathBuf>;
}

/// Replace anything that cannot live in a single file-name component
fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Writes `<base>-<category>.m3u` files: one URL per line, UTF-8, no header
pub struct M3uFileWriter {
    output_dir: PathBuf,
}

impl M3uFileWriter {
    /// Create the writer, making sure the output directory exists
    pub async fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();

        fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create output dir {}", output_dir.display()))?;

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Deterministic artifact path for a category
    pub fn path_for(&self, category: &str, base_name: &str) -> PathBuf {
        let file_name = format!(
            "{}-{}.m3u",
            sanitize_component(base_name),
            sanitize_component(category)
        );
        self.output_dir.join(file_name)
    }
}

#[async_trait]
impl PlaylistSink for M3uFileWriter {
    async fn write(&self, category: &str, urls: &[String], base_name: &str) -> Result<PathBuf> {
        let final_path = self.path_for(category, base_name);
        let tmp_path = final_path.with_extension("m3u.tmp");

        let file = File::create(&tmp_path)
            .await
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file); // 64KB buffer

        let write_result = async {
            for url in urls {
                writer.write_all(url.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.flush().await?;
            writer.get_ref().sync_all().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        // Release the file handle before renaming or cleaning up
        drop(writer);

        if let Err(e) = write_result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("Failed to write {}", tmp_path.display()));
        }

        // Atomic rename
        let _ = fs::remove_file(&final_path).await;
        fs::rename(&tmp_path, &final_path)
            .await
            .with_context(|| format!("Failed to move playlist into {}", final_path.display()))?;

        Ok(final_path)
    }
}
