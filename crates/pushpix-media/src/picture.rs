use image::{GenericImageView, ImageFormat};

/// Errors that can occur while validating downloaded image bytes.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// No bytes were provided.
    #[error("image data is empty")]
    Empty,
    /// The leading bytes do not match any known image signature.
    #[error("failed to detect image format: {0}")]
    UnknownFormat(#[source] image::ImageError),
    /// The format was detected but is not one that can be attached.
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(ImageFormat),
    /// The bytes claim to be an image but could not be decoded.
    #[error("failed to decode {format:?} image: {source}")]
    Decode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
    /// The blocking decode task panicked or was cancelled.
    #[error("image decoding was interrupted: {0}")]
    Interrupted(#[source] tokio::task::JoinError),
}

/// A downloaded picture that was successfully decoded.
///
/// The original encoded bytes are kept, so persisting the image does not
/// require re-encoding it.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    format: ImageFormat,
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase name of the format, as reported on attachments.
    pub fn format_name(&self) -> &'static str {
        format_names(self.format).map_or("unknown", |(name, _)| name)
    }

    /// File extension matching the format, without the leading dot.
    pub fn extension(&self) -> &'static str {
        format_names(self.format).map_or("bin", |(_, extension)| extension)
    }
}

/// Maps the formats accepted as attachments to their name and extension.
fn format_names(format: ImageFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ImageFormat::Png => Some(("png", "png")),
        ImageFormat::Jpeg => Some(("jpeg", "jpg")),
        ImageFormat::Gif => Some(("gif", "gif")),
        ImageFormat::WebP => Some(("webp", "webp")),
        ImageFormat::Bmp => Some(("bmp", "bmp")),
        _ => None,
    }
}

/// Detects the format of `bytes` and decodes them completely.
pub fn decode_image(bytes: Vec<u8>) -> Result<DecodedImage, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    let format = image::guess_format(&bytes).map_err(MediaError::UnknownFormat)?;
    if format_names(format).is_none() {
        return Err(MediaError::UnsupportedFormat(format));
    }

    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|source| MediaError::Decode { format, source })?;
    let (width, height) = decoded.dimensions();
    log::debug!("Decoded {format:?} image of {width}x{height} ({} bytes)", bytes.len());

    Ok(DecodedImage {
        format,
        width,
        height,
        bytes,
    })
}

/// Runs [`decode_image`] on the blocking thread pool, keeping the async
/// workers free while large images are decoded.
pub async fn decode_image_blocking(bytes: Vec<u8>) -> Result<DecodedImage, MediaError> {
    tokio::task::spawn_blocking(move || decode_image(bytes))
        .await
        .map_err(MediaError::Interrupted)?
}
