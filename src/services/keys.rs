//! Storage key generation.
//!
//! Keys have the shape `<prefix>/<id>.<ext>`, where `id` is 32 random bytes
//! from the thread-local CSPRNG encoded as unpadded URL-safe base64. Nothing
//! checks keys against existing objects.

use crate::services::probe::Orientation;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

/// Extension of every processed video; the remux step always writes MP4.
pub const VIDEO_EXTENSION: &str = "mp4";

const ID_BYTES: usize = 32;

/// Random opaque identifier, 43 URL-safe characters.
pub fn random_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Key for a processed video, namespaced by orientation.
pub fn video_key(orientation: Orientation) -> String {
    format!("{}/{}.{}", orientation.as_str(), random_id(), VIDEO_EXTENSION)
}

/// Key for a thumbnail image.
pub fn thumbnail_key(extension: &str) -> String {
    format!("thumbnails/{}.{}", random_id(), extension)
}
