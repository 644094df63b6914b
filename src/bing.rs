use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::config::{ImageResolution, RunConfig};
use crate::error::{Result, SyncError};
use crate::setter::WallpaperSetter;

/// Today's image only: `idx=0` is today, `n=1` asks for a single entry.
pub const BING_ARCHIVE_URL: &str = "https://www.bing.com/HPImageArchive.aspx?format=js&idx=0&n=1";
pub const BING_IMAGE_HOST: &str = "http://www.bing.com";

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ImageArchive {
    #[serde(default)]
    pub images: Vec<ImageMetadata>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct ImageMetadata {
    #[serde(default)]
    pub urlbase: String,
    #[serde(default)]
    pub copyright: Option<String>,
}

/// Everything derived from one `urlbase` and a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub image_id: String,
    pub file_name: String,
    pub download_url: String,
}

impl ImageTarget {
    pub fn build(
        urlbase: &str,
        resolution: ImageResolution,
        image_host: &str,
    ) -> Result<ImageTarget> {
        let parsed = Url::parse(image_host)?.join(urlbase)?;
        let image_id = parsed
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SyncError::Parse(format!("no image id in urlbase {urlbase:?}")))?;
        if image_id.contains(['/', '\\']) || image_id.starts_with('.') {
            return Err(SyncError::Parse(format!("unusable image id {image_id:?}")));
        }
        let suffix = resolution.suffix();
        Ok(ImageTarget {
            file_name: format!("{image_id}_{suffix}.jpg"),
            download_url: format!("{}{urlbase}_{suffix}.jpg", image_host.trim_end_matches('/')),
            image_id,
        })
    }
}

pub fn target_path(download_dir: &Path, file_name: &str) -> PathBuf {
    download_dir.join(file_name)
}

/// Directories and other non-regular entries do not count.
pub fn is_downloaded(path: &Path) -> bool {
    path.is_file()
}

fn part_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub image: ImageMetadata,
    pub target: ImageTarget,
    /// Absolute path handed to the wallpaper setter.
    pub path: PathBuf,
    /// Bytes written, or `None` when the image was already on disk.
    pub downloaded: Option<u64>,
}

pub struct Bing {
    pub config: RunConfig,
    pub client: Client,
    archive_url: String,
    image_host: String,
}

impl Bing {
    pub fn new(config: RunConfig) -> Self {
        Bing::with_endpoints(config, Client::new(), BING_ARCHIVE_URL, BING_IMAGE_HOST)
    }

    pub fn with_endpoints(
        config: RunConfig,
        client: Client,
        archive_url: impl Into<String>,
        image_host: impl Into<String>,
    ) -> Self {
        Bing {
            config,
            client,
            archive_url: archive_url.into(),
            image_host: image_host.into(),
        }
    }

    pub async fn fetch_metadata(&self) -> Result<ImageMetadata> {
        debug!(url = %self.archive_url, "fetching image archive");
        let data = self
            .client
            .get(&self.archive_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let archive: ImageArchive = serde_json::from_str(&data)?;
        archive
            .images
            .into_iter()
            .next()
            .ok_or(SyncError::EmptyResult)
    }

    /// Fetch today's metadata, download the image unless it is already on
    /// disk, then hand it to `setter`.
    pub async fn sync<S: WallpaperSetter>(&self, setter: &S) -> Result<SyncOutcome> {
        self.config.ensure_download_dir()?;

        let image = self.fetch_metadata().await?;
        let target = ImageTarget::build(&image.urlbase, self.config.resolution(), &self.image_host)?;
        let path = target_path(&self.config.download_dir, &target.file_name);

        let downloaded = if is_downloaded(&path) {
            info!(file = %target.file_name, "image already downloaded");
            None
        } else {
            let written = download_and_save_file(&self.client, &target.download_url, &path).await?;
            info!(file = %target.file_name, bytes = written, "image downloaded");
            Some(written)
        };

        let path = std::path::absolute(&path).map_err(|err| SyncError::fs(&path, err))?;
        setter.set_wallpaper(&path)?;

        Ok(SyncOutcome {
            image,
            target,
            path,
            downloaded,
        })
    }
}

/// Stream `url` into `path`. The body lands in a `.part` sibling first and is
/// renamed once complete, so `path` never holds a truncated image.
pub async fn download_and_save_file(client: &Client, url: &str, path: &Path) -> Result<u64> {
    debug!(url, path = %path.display(), "downloading image");
    let response = client.get(url).send().await?.error_for_status()?;

    let bar = match response.content_length() {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} ({bytes_per_sec})")
    {
        bar.set_style(style);
    }

    let part = part_path(path);
    let written = write_body(response, &part, &bar).await;
    bar.finish_and_clear();

    match written {
        Ok(written) => {
            tokio::fs::rename(&part, path)
                .await
                .map_err(|err| SyncError::fs(path, err))?;
            Ok(written)
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&part).await;
            Err(err)
        }
    }
}

async fn write_body(response: Response, part: &Path, bar: &ProgressBar) -> Result<u64> {
    let mut file = File::create(part)
        .await
        .map_err(|err| SyncError::fs(part, err))?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|err| SyncError::fs(part, err))?;
        written += chunk.len() as u64;
        bar.inc(chunk.len() as u64);
    }
    file.flush().await.map_err(|err| SyncError::fs(part, err))?;
    Ok(written)
}
