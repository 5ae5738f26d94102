use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::error::{MosaicError, Result};

/// Fetches raw bytes from a URL.
///
/// The seam lets listing and download logic run against canned pages in tests.
pub trait IndexClient: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP client for index pages and channel files.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(600))
    }

    /// Channel files are hundreds of megabytes, so the timeout covers a whole
    /// transfer, not just the connection.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MosaicError::Download(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl IndexClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| MosaicError::Download(format!("Request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MosaicError::Download(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| MosaicError::Download(format!("Failed to read {url}: {e}")))
    }
}

/// Names of every link on an HTML index page whose text contains `image_type`,
/// in page order.
pub fn list_links(html: &str, image_type: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a")
        .map_err(|e| MosaicError::Download(format!("Invalid link selector: {e}")))?;
    Ok(document
        .select(&anchors)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty() && name.contains(image_type))
        .collect())
}

/// Join a link name onto an index URL.
pub fn join_url(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Whether `name` is a bare file name: exactly one normal path component.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// `path` with `.part` appended, where a download lands until it completes.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Fetch every `image_type` file listed on the index page at `url` into
/// `folder`, returning the local paths in page order.
///
/// Files already present in `folder` are not downloaded again. Links whose
/// text is not a bare file name are skipped. Each file is written under a
/// `.part` name and renamed once complete. Failing to fetch the page or any
/// listed file is an error.
pub fn fetch_listing(
    client: &dyn IndexClient,
    url: &str,
    folder: &Path,
    image_type: &str,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(folder)?;

    let page = client.get(url)?;
    let html = String::from_utf8_lossy(&page);
    let names = list_links(&html, image_type)?;
    info!(url, count = names.len(), "Listed {image_type} images");

    let mut local = Vec::with_capacity(names.len());
    for name in names {
        if !is_plain_file_name(&name) {
            warn!(link = %name, "Skipping link that is not a plain file name");
            continue;
        }
        let path = folder.join(&name);
        if path.exists() {
            debug!(file = %path.display(), "Already downloaded");
        } else {
            let file_url = join_url(url, &name);
            info!(url = %file_url, to = %path.display(), "Downloading");
            let bytes = client.get(&file_url)?;
            let partial = partial_path(&path);
            fs::write(&partial, bytes)?;
            fs::rename(&partial, &path)?;
        }
        local.push(path);
    }
    Ok(local)
}
