//! Where the CSV comes from.
//!
//! A local file is read in place. A remote file is downloaded into a named
//! temporary file that lives as long as the returned [`FetchedCsv`].

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::{Error, Result};

/// A CSV input location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvSource {
    /// A file on disk, relative paths resolve against the working directory.
    Local(PathBuf),
    /// An `http` or `https` URL to download.
    Remote(Url),
}

impl CsvSource {
    /// A local file.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        CsvSource::Local(path.into())
    }

    /// A remote file. Only `http` and `https` URLs are accepted.
    pub fn remote(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(CsvSource::Remote(parsed)),
            other => Err(Error::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                url, other
            ))),
        }
    }

    /// Whether the source has to be downloaded.
    pub fn is_remote(&self) -> bool {
        matches!(self, CsvSource::Remote(_))
    }

    /// Make the CSV available as a file on disk.
    pub async fn fetch(&self) -> Result<FetchedCsv> {
        self.fetch_in(None).await
    }

    /// Like [`fetch`](Self::fetch), downloading into `temp_dir` instead of
    /// the system temporary directory when given.
    pub async fn fetch_in(&self, temp_dir: Option<&Path>) -> Result<FetchedCsv> {
        match self {
            CsvSource::Local(path) => {
                let resolved = std::env::current_dir()?.join(path);
                if !resolved.is_file() {
                    return Err(Error::InputNotFound(resolved));
                }
                debug!(path = %resolved.display(), "Using local CSV");
                Ok(FetchedCsv {
                    path: resolved,
                    temp: None,
                })
            }
            CsvSource::Remote(url) => download(url, temp_dir).await,
        }
    }
}

/// A CSV file ready to be read.
///
/// Downloaded files are removed when this value is dropped or closed.
#[derive(Debug)]
pub struct FetchedCsv {
    path: PathBuf,
    temp: Option<NamedTempFile>,
}

impl FetchedCsv {
    /// Path of the CSV on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this file was downloaded into a temporary file.
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Remove the temporary file, if there is one, reporting any failure.
    pub fn close(self) -> Result<()> {
        if let Some(temp) = self.temp {
            temp.close()?;
            info!(path = %self.path.display(), "Removed temporary files");
        }
        Ok(())
    }
}

async fn download(url: &Url, temp_dir: Option<&Path>) -> Result<FetchedCsv> {
    info!(url = %url, "Downloading CSV");

    let response = reqwest::get(url.clone())
        .await
        .and_then(|r| r.error_for_status())
        .map_err(Error::Download)?;
    let body = response.bytes().await.map_err(Error::Download)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix("anki-csv-").suffix(".csv");
    let mut temp = match temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    temp.write_all(&body)?;
    temp.flush()?;

    let path = temp.path().to_path_buf();
    info!(path = %path.display(), bytes = body.len(), "Wrote CSV");

    Ok(FetchedCsv {
        path,
        temp: Some(temp),
    })
}
