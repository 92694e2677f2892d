use std::path::{Path, PathBuf};

use pushpix_bridge::notification::Attachment;
use tokio::{
    fs::{OpenOptions, create_dir_all},
    io::AsyncWriteExt,
};
use uuid::Uuid;

use crate::picture::DecodedImage;

/// Errors that can occur while writing an attachment to disk.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The caller supplied an identifier that cannot be used as a file name.
    #[error("invalid attachment identifier: {0:?}")]
    InvalidIdentifier(String),
    /// The unique attachment directory could not be created.
    #[error("failed to create attachment directory {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The image file could not be created or written.
    #[error("failed to write attachment file {path:?}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes decoded images below a root directory, one fresh subdirectory per
/// attachment.
///
/// Subdirectories are named with random UUIDs, so concurrent enrichments
/// sharing the same root never collide. Nothing written here is ever removed
/// by this type.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists `image` and returns the attachment describing it.
    ///
    /// When `identifier` is `None`, a random one is generated. The file is
    /// named `<identifier>.<extension>` where the extension follows the
    /// decoded image format.
    pub async fn persist(
        &self,
        identifier: Option<&str>,
        image: &DecodedImage,
    ) -> Result<Attachment, StorageError> {
        let identifier = match identifier {
            Some(identifier) => validate_identifier(identifier)?,
            None => Uuid::new_v4().to_string(),
        };

        let directory = self.root.join(Uuid::new_v4().simple().to_string());
        create_dir_all(&directory)
            .await
            .map_err(|source| StorageError::CreateDirectory {
                path: directory.clone(),
                source,
            })?;

        let file_path = directory.join(format!("{identifier}.{}", image.extension()));
        write_new_file(&file_path, image.bytes())
            .await
            .map_err(|source| StorageError::WriteFile {
                path: file_path.clone(),
                source,
            })?;
        log::debug!("Stored attachment {identifier} at {file_path:?}");

        Ok(Attachment {
            identifier,
            file_path,
            format: image.format_name().to_string(),
        })
    }
}

fn validate_identifier(identifier: &str) -> Result<String, StorageError> {
    let usable = !identifier.is_empty()
        && identifier != "."
        && identifier != ".."
        && !identifier.contains(['/', '\\', '\0']);
    if usable {
        Ok(identifier.to_string())
    } else {
        Err(StorageError::InvalidIdentifier(identifier.to_string()))
    }
}

async fn write_new_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::ImageFormat;

    use super::*;
    use crate::picture::{decode_image, tests::encoded};

    fn png() -> DecodedImage {
        decode_image(encoded(ImageFormat::Png, 2, 2)).unwrap()
    }

    #[tokio::test]
    async fn writes_file_with_format_extension() {
        let root = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(root.path());

        let attachment = store.persist(Some("picture"), &png()).await.unwrap();

        assert_eq!(attachment.identifier, "picture");
        assert_eq!(attachment.format, "png");
        assert_eq!(
            attachment.file_path.file_name().unwrap().to_str(),
            Some("picture.png")
        );
        assert!(attachment.file_path.starts_with(root.path()));
        let written = std::fs::read(&attachment.file_path).unwrap();
        assert_eq!(written, png().bytes());
    }

    #[tokio::test]
    async fn generates_identifier_when_missing() {
        let root = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(root.path());

        let attachment = store.persist(None, &png()).await.unwrap();

        assert!(Uuid::parse_str(&attachment.identifier).is_ok());
        assert!(attachment.file_path.exists());
    }

    #[tokio::test]
    async fn same_identifier_lands_in_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(root.path());

        let first = store.persist(Some("same"), &png()).await.unwrap();
        let second = store.persist(Some("same"), &png()).await.unwrap();

        assert_ne!(first.file_path.parent(), second.file_path.parent());
        assert!(first.file_path.exists());
        assert!(second.file_path.exists());
    }

    #[tokio::test]
    async fn creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(root.path().join("nested").join("deeper"));

        let attachment = store.persist(None, &png()).await.unwrap();
        assert!(attachment.file_path.exists());
    }

    #[tokio::test]
    async fn rejects_path_like_identifiers() {
        let root = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(root.path());

        for identifier in ["", "..", "../escape", "a/b"] {
            let result = store.persist(Some(identifier), &png()).await;
            assert!(
                matches!(result, Err(StorageError::InvalidIdentifier(_))),
                "{identifier:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn reports_unwritable_root() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let store = AttachmentStore::new(&blocker);

        let result = store.persist(None, &png()).await;
        assert!(matches!(result, Err(StorageError::CreateDirectory { .. })));
    }
}
