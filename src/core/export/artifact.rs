//! CSV artifact writing
//!
//! Pages are serialized with the `csv` crate into an in-memory buffer and
//! appended to the output with a single `write_all` per page. The header is
//! taken from the first row of the first non-empty page and written once.

use crate::domain::{Page, Result, Row, RowshipError};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Destination for exported pages
#[async_trait]
pub trait PageSink: Send {
    /// Append a page, writing the header first if this is the first
    /// non-empty page
    async fn write_page(&mut self, page: &Page) -> Result<()>;
}

/// Artifact file name for a run started at `started_at`
///
/// ```
/// use chrono::NaiveDate;
/// use rowship::core::export::artifact_file_name;
///
/// let ts = NaiveDate::from_ymd_opt(2025, 3, 9)
///     .unwrap()
///     .and_hms_opt(14, 5, 0)
///     .unwrap();
/// assert_eq!(artifact_file_name("timeline", ts), "timeline_20250309_140500.csv");
/// ```
pub fn artifact_file_name(prefix: &str, started_at: NaiveDateTime) -> String {
    format!("{}_{}.csv", prefix, started_at.format("%Y%m%d_%H%M%S"))
}

/// CSV serializer over any async writer
pub struct CsvArtifactWriter<W> {
    out: W,
    header: Option<Vec<String>>,
    rows_written: u64,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin + Send> CsvArtifactWriter<W> {
    /// Wrap `out`; nothing is written until the first non-empty page
    pub fn new(out: W) -> Self {
        Self {
            out,
            header: None,
            rows_written: 0,
            bytes_written: 0,
        }
    }

    /// Header in effect, once the first page has been written
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Bytes written so far, header included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and hand back the underlying writer
    pub async fn finish(mut self) -> Result<W> {
        self.out.flush().await?;
        Ok(self.out)
    }

    fn encode(&mut self, page: &Page) -> Result<Vec<u8>> {
        let mut csv = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        if self.header.is_none() {
            let header = page.column_names().unwrap_or_default();
            csv.write_record(&header)?;
            self.header = Some(header);
        }

        let header = self.header.as_deref().unwrap_or(&[]);
        for row in &page.rows {
            csv.write_record(record_for(header, row)?)?;
        }

        csv.into_inner()
            .map_err(|e| RowshipError::Export(format!("CSV buffer flush failed: {}", e.error())))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> PageSink for CsvArtifactWriter<W> {
    async fn write_page(&mut self, page: &Page) -> Result<()> {
        if page.is_empty() {
            return Ok(());
        }

        let buffer = self.encode(page)?;
        self.out.write_all(&buffer).await?;

        self.rows_written += page.len() as u64;
        self.bytes_written += buffer.len() as u64;
        Ok(())
    }
}

/// Values of `row` in header order
///
/// A column missing from the row is written empty; a column the header does
/// not know means the table changed shape mid-run.
fn record_for<'a>(header: &[String], row: &'a Row) -> Result<Vec<&'a str>> {
    let same_shape = row.fields.len() == header.len()
        && row.fields.iter().zip(header).all(|(f, h)| &f.name == h);

    if same_shape {
        return Ok(row
            .fields
            .iter()
            .map(|f| f.value.as_deref().unwrap_or(""))
            .collect());
    }

    if let Some(extra) = row.fields.iter().find(|f| !header.contains(&f.name)) {
        return Err(RowshipError::Export(format!(
            "Row {} has column '{}' not present in the header; the table schema changed during the run",
            row.id, extra.name
        )));
    }

    Ok(header
        .iter()
        .map(|name| {
            row.get(name)
                .and_then(|f| f.value.as_deref())
                .unwrap_or("")
        })
        .collect())
}

/// Summary of a finished artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Local path
    pub path: PathBuf,

    /// Data rows, header excluded
    pub rows: u64,

    /// File size in bytes
    pub bytes: u64,
}

/// The run's local CSV file
///
/// The file is created on the first non-empty page, so a run that finds no
/// new rows leaves nothing behind.
pub struct LocalArtifact {
    path: PathBuf,
    writer: Option<CsvArtifactWriter<BufWriter<File>>>,
}

impl LocalArtifact {
    /// Artifact that will be written at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been created
    pub fn is_created(&self) -> bool {
        self.writer.is_some()
    }

    /// Create the file without touching an existing one
    ///
    /// A retained artifact from an earlier run in the same second keeps its
    /// name; this run moves on to `<stem>_1.csv`, `<stem>_2.csv` and so on.
    async fn create_file(&mut self) -> Result<File> {
        let base = self.path.clone();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.clone()
            } else {
                suffixed(&base, attempt)
            };

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => {
                    self.path = candidate;
                    return Ok(file);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %candidate.display(), "Artifact name taken");
                }
                Err(e) => {
                    return Err(RowshipError::Export(format!(
                        "Cannot create artifact {}: {}",
                        candidate.display(),
                        e
                    )))
                }
            }
        }

        Err(RowshipError::Export(format!(
            "Cannot create artifact {}: {} candidate names already exist",
            base.display(),
            MAX_NAME_ATTEMPTS
        )))
    }

    /// Flush, fsync and close the file
    ///
    /// Returns `None` when no rows were written. A file that cannot be made
    /// durable is removed.
    pub async fn finish(mut self) -> Result<Option<ArtifactInfo>> {
        let Some(writer) = self.writer.take() else {
            return Ok(None);
        };

        let rows = writer.rows_written();
        let bytes = writer.bytes_written();

        let closed = async {
            let file = writer.finish().await?.into_inner();
            file.sync_all().await?;
            Ok::<(), RowshipError>(())
        }
        .await;

        if let Err(e) = closed {
            remove_quietly(&self.path).await;
            return Err(RowshipError::Export(format!(
                "Failed to close artifact {}: {}",
                self.path.display(),
                e
            )));
        }

        tracing::debug!(path = %self.path.display(), rows = rows, bytes = bytes, "Artifact closed");

        Ok(Some(ArtifactInfo {
            path: self.path,
            rows,
            bytes,
        }))
    }

    /// Drop the partially written file
    pub async fn discard(mut self) {
        if self.writer.take().is_some() {
            remove_quietly(&self.path).await;
            tracing::info!(path = %self.path.display(), "Discarded partial artifact");
        }
    }
}

#[async_trait]
impl PageSink for LocalArtifact {
    async fn write_page(&mut self, page: &Page) -> Result<()> {
        if page.is_empty() {
            return Ok(());
        }

        if self.writer.is_none() {
            let file = self.create_file().await?;
            tracing::debug!(path = %self.path.display(), "Artifact created");
            self.writer = Some(CsvArtifactWriter::new(BufWriter::new(file)));
        }

        match self.writer.as_mut() {
            Some(writer) => writer.write_page(page).await,
            None => Ok(()),
        }
    }
}

/// Names tried before giving up on creating an artifact
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `dir/stem.ext` as `dir/stem_n.ext`
fn suffixed(path: &Path, n: u32) -> PathBuf {
    let mut name = path.file_stem().unwrap_or_default().to_os_string();
    name.push(format!("_{n}"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove artifact");
        }
    }
}
