//! Local attachment ingestion
//!
//! Reads a user-selected file, detects its MIME type, base64-encodes the
//! content for inline transmission, and records a local preview reference.

use crate::error::{MedchatError, Result};
use crate::transcript::{Attachment, ImageDimensions};
use base64::Engine;
use std::path::Path;
use url::Url;

/// MIME type used when nothing more specific can be detected
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Read a file into an [`Attachment`]
///
/// # Arguments
///
/// * `path` - File to attach
/// * `max_bytes` - Largest file size accepted
///
/// # Errors
///
/// Returns [`MedchatError::FileRead`] if the path is not a readable regular
/// file, is empty, or is larger than `max_bytes`.
///
/// # Examples
///
/// ```no_run
/// use medchat::attachment::ingest;
/// use std::path::Path;
///
/// # async fn example() -> medchat::error::Result<()> {
/// let attachment = ingest(Path::new("scan.png"), 20 * 1024 * 1024).await?;
/// assert_eq!(attachment.mime_type, "image/png");
/// # Ok(())
/// # }
/// ```
pub async fn ingest(path: &Path, max_bytes: u64) -> Result<Attachment> {
    let display = path.display().to_string();
    let read_error = |e: std::io::Error| MedchatError::FileRead(format!("{}: {}", display, e));

    let metadata = tokio::fs::metadata(path).await.map_err(read_error)?;
    if !metadata.is_file() {
        return Err(MedchatError::FileRead(format!("{}: not a regular file", display)).into());
    }
    if metadata.len() > max_bytes {
        return Err(MedchatError::FileRead(format!(
            "{}: file is {} bytes, limit is {} bytes",
            display,
            metadata.len(),
            max_bytes
        ))
        .into());
    }

    let bytes = tokio::fs::read(path).await.map_err(read_error)?;
    if bytes.is_empty() {
        return Err(MedchatError::FileRead(format!("{}: file is empty", display)).into());
    }
    let mime_type = detect_mime_type(path, &bytes);
    let dimensions = if mime_type.starts_with("image/") {
        image_dimensions(&bytes)
    } else {
        None
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| display.clone());

    let attachment = Attachment {
        name,
        mime_type,
        size: bytes.len() as u64,
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        preview_url: preview_url(path).await?,
        dimensions,
    };

    tracing::debug!(
        name = %attachment.name,
        mime_type = %attachment.mime_type,
        size = attachment.size,
        "Ingested attachment"
    );
    Ok(attachment)
}

/// Detect a MIME type from the file extension and, for images, the content
///
/// Document extensions are trusted as given. Magic bytes are only consulted
/// when the extension is missing or names an image, so a text file whose
/// first bytes happen to look like an image signature stays text.
///
/// # Examples
///
/// ```
/// use medchat::attachment::detect_mime_type;
/// use std::path::Path;
///
/// let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
/// assert_eq!(detect_mime_type(Path::new("noext"), png), "image/png");
/// assert_eq!(detect_mime_type(Path::new("notes.md"), b"# hi"), "text/markdown");
/// assert_eq!(detect_mime_type(Path::new("bmi.txt"), b"BMI 31"), "text/plain");
/// ```
pub fn detect_mime_type(path: &Path, bytes: &[u8]) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(mime) = document_mime_type(&extension) {
        return mime.to_string();
    }

    let declared_image = image_mime_type(&extension);
    if extension.is_empty() || declared_image.is_some() {
        if let Ok(format) = image::guess_format(bytes) {
            return format.to_mime_type().to_string();
        }
    }
    if let Some(mime) = declared_image {
        return mime.to_string();
    }

    if bytes.starts_with(b"%PDF-") {
        return "application/pdf".to_string();
    }
    DEFAULT_MIME_TYPE.to_string()
}

fn document_mime_type(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "xml" => "text/xml",
        "rtf" => "text/rtf",
        "mp3" => "audio/mp3",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => return None,
    };
    Some(mime)
}

fn image_mime_type(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => return None,
    };
    Some(mime)
}

fn image_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok((width, height)) => Some(ImageDimensions { width, height }),
        Err(e) => {
            tracing::debug!("Could not read image dimensions: {}", e);
            None
        }
    }
}

async fn preview_url(path: &Path) -> Result<Url> {
    let absolute = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| MedchatError::FileRead(format!("{}: {}", path.display(), e)))?;
    Url::from_file_path(&absolute).map_err(|_| {
        MedchatError::FileRead(format!(
            "{}: cannot build a preview reference",
            absolute.display()
        ))
        .into()
    })
}
