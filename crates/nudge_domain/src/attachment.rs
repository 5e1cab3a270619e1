use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Media file attached to a notification's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub path: PathBuf,
    pub content_type: String,
}

impl Attachment {
    /// Wraps a written file, removing it again when it cannot be attached.
    pub fn wrap(id: impl Into<String>, path: PathBuf) -> Option<Self> {
        let id = id.into();
        let Some(format) = MediaFormat::from_path(&path) else {
            tracing::warn!(%id, path = %path.display(), "unsupported attachment type");
            remove_quietly(&path);
            return None;
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.len() > 0 => Some(Self {
                id,
                path,
                content_type: format.content_type().to_string(),
            }),
            _ => {
                tracing::warn!(%id, path = %path.display(), "attachment file is empty or missing");
                remove_quietly(&path);
                None
            }
        }
    }

    /// Deletes the backing file of an attachment that was never submitted.
    pub fn discard(&self) {
        remove_quietly(&self.path);
    }
}

fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), %err, "unable to remove attachment file");
        }
    }
}

/// Produces one attachment; absence means "no attachment for this item".
#[async_trait]
pub trait AttachmentFactory: Send + Sync {
    async fn make_attachment(&self) -> Option<Attachment>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Png,
    Jpeg,
    Gif,
    Mp3,
    M4a,
    Mp4,
}

impl MediaFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Mp4 => "mp4",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Mp3 => "audio/mpeg",
            Self::M4a => "audio/mp4",
            Self::Mp4 => "video/mp4",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "mp3" => Some(Self::Mp3),
            "m4a" => Some(Self::M4a),
            "mp4" => Some(Self::Mp4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: MediaFormat,
}

/// Rendering backend supplied by the host: raster images, rendered symbols
/// and rendered views all reduce to encoded bytes.
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    async fn encode(&self) -> anyhow::Result<EncodedImage>;
}

pub struct ImageAttachment<E> {
    id: String,
    encoder: E,
    scratch_dir: PathBuf,
}

impl<E: ImageEncoder> ImageAttachment<E> {
    pub fn new(id: impl Into<String>, encoder: E, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            encoder,
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait]
impl<E: ImageEncoder> AttachmentFactory for ImageAttachment<E> {
    async fn make_attachment(&self) -> Option<Attachment> {
        let image = match self.encoder.encode().await {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(id = %self.id, %err, "image encoding failed");
                return None;
            }
        };
        if image.bytes.is_empty() {
            tracing::warn!(id = %self.id, "image encoder produced no data");
            return None;
        }
        let path = write_scratch(&self.scratch_dir, &self.id, image.format, &image.bytes)
            .map_err(|err| tracing::warn!(id = %self.id, %err, "unable to write attachment"))
            .ok()?;
        Attachment::wrap(self.id.clone(), path)
    }
}

/// Copies an existing media file into the scratch directory, since the OS
/// store takes ownership of attached files.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    id: String,
    source: PathBuf,
    scratch_dir: PathBuf,
}

impl FileAttachment {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait]
impl AttachmentFactory for FileAttachment {
    async fn make_attachment(&self) -> Option<Attachment> {
        let Some(format) = MediaFormat::from_path(&self.source) else {
            tracing::warn!(
                id = %self.id,
                source = %self.source.display(),
                "unsupported attachment type"
            );
            return None;
        };
        let bytes = tokio::fs::read(&self.source)
            .await
            .map_err(|err| {
                tracing::warn!(
                    id = %self.id,
                    source = %self.source.display(),
                    %err,
                    "unable to read attachment source"
                );
            })
            .ok()?;
        let path = write_scratch(&self.scratch_dir, &self.id, format, &bytes)
            .map_err(|err| tracing::warn!(id = %self.id, %err, "unable to write attachment"))
            .ok()?;
        Attachment::wrap(self.id.clone(), path)
    }
}

// Synchronous on purpose: no await point between creating and keeping the
// file, so a cancelled schedule call cannot leave an untracked file behind.
fn write_scratch(dir: &Path, id: &str, format: MediaFormat, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{id}-"))
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    let path = file.into_temp_path().keep().map_err(|err| err.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct StaticEncoder(Vec<u8>);

    #[async_trait]
    impl ImageEncoder for StaticEncoder {
        async fn encode(&self) -> anyhow::Result<EncodedImage> {
            Ok(EncodedImage {
                bytes: self.0.clone(),
                format: MediaFormat::Png,
            })
        }
    }

    struct FailingEncoder;

    #[async_trait]
    impl ImageEncoder for FailingEncoder {
        async fn encode(&self) -> anyhow::Result<EncodedImage> {
            anyhow::bail!("renderer unavailable")
        }
    }

    #[tokio::test]
    async fn image_attachment_writes_scratch_file() {
        let dir = tempdir().expect("tempdir");
        let factory = ImageAttachment::new("badge", StaticEncoder(vec![1, 2, 3]), dir.path());
        let attachment = factory.make_attachment().await.expect("attachment produced");
        assert_eq!(attachment.id, "badge");
        assert_eq!(attachment.content_type, "image/png");
        assert!(attachment.path.starts_with(dir.path()));
        assert_eq!(fs::read(&attachment.path).unwrap(), vec![1, 2, 3]);

        attachment.discard();
        assert!(!attachment.path.exists());
    }

    #[tokio::test]
    async fn encoder_failure_is_absence() {
        let dir = tempdir().expect("tempdir");
        let factory = ImageAttachment::new("broken", FailingEncoder, dir.path());
        assert!(factory.make_attachment().await.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn file_attachment_copies_source() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("cover.JPG");
        fs::write(&source, b"jpeg-bytes").unwrap();
        let scratch = dir.path().join("scratch");

        let attachment = FileAttachment::new("cover", &source, &scratch)
            .make_attachment()
            .await
            .expect("attachment produced");
        assert_eq!(attachment.content_type, "image/jpeg");
        assert!(attachment.path.starts_with(&scratch));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn missing_source_is_absence() {
        let dir = tempdir().expect("tempdir");
        let factory = FileAttachment::new("gone", dir.path().join("nope.png"), dir.path());
        assert!(factory.make_attachment().await.is_none());
    }

    #[test]
    fn wrap_removes_empty_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.png");
        fs::write(&path, b"").unwrap();
        assert!(Attachment::wrap("empty", path.clone()).is_none());
        assert!(!path.exists());
    }
}
