//! Image handling for enriched notifications.
//!
//! Downloaded pictures arrive as untrusted bytes. This crate provides the two
//! steps needed before such bytes can be shown as a notification attachment:
//! - Sniffing and fully decoding the image, so that truncated or bogus
//!   payloads are rejected instead of being handed to the host.
//! - Persisting the validated bytes into a freshly created, uniquely named
//!   directory, with a file extension that matches the decoded format.
//!
//! Cleanup of written files is left to the host environment.

pub mod picture;
pub mod storage;

pub use crate::picture::{DecodedImage, MediaError, decode_image, decode_image_blocking};
pub use crate::storage::{AttachmentStore, StorageError};
