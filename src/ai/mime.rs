//! Image format sniffing for inline prompt images.

/// Image formats Gemini accepts as inline data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageFormat {
    /// Identify an image by its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', ..] => Some(Self::Png),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }
}

/// MIME type for an inline image; unrecognized data is sent as PNG.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match ImageFormat::sniff(bytes) {
        Some(format) => format.mime_type(),
        None => {
            tracing::warn!(
                "Unrecognized image ({} bytes, starting {:02X?}), sending as image/png",
                bytes.len(),
                &bytes[..bytes.len().min(4)]
            );
            ImageFormat::Png.mime_type()
        }
    }
}
