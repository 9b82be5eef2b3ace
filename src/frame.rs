//! Extracted frame values.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
    sync::Arc,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};

use crate::{error::FramewiseError, utilities::frame_index_to_seconds};

/// Encoding of an extracted frame's image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameFormat {
    /// Baseline JPEG.
    #[default]
    Jpeg,
}

impl FrameFormat {
    /// Short tag, e.g. `"jpeg"`.
    pub fn as_str(self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "image/jpeg",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            FrameFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// One exactly-decoded video frame.
///
/// The image bytes are held base64-encoded, ready to hand to a presentation
/// layer, and shared: cloning an `ExtractedFrame` does not copy them.
///
/// # Example
///
/// ```no_run
/// use framewise::{ExtractOptions, FrameExtractor};
///
/// # async fn example() -> Result<(), framewise::FramewiseError> {
/// let extractor = FrameExtractor::new(ExtractOptions::new());
/// let frame = extractor.extract("input.mp4", 150, 30.0).await?;
/// assert_eq!(frame.timestamp(), 5.0);
/// frame.save("frame_150.jpg")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq)]
pub struct ExtractedFrame {
    index: u64,
    timestamp: f64,
    data: Arc<str>,
    format: FrameFormat,
}

impl Debug for ExtractedFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractedFrame")
            .field("index", &self.index)
            .field("timestamp", &self.timestamp)
            .field("format", &self.format)
            .field("encoded_len", &self.data.len())
            .finish()
    }
}

impl ExtractedFrame {
    /// Wrap raw JPEG bytes for `index`, deriving the timestamp from
    /// `frame_rate`.
    pub fn from_jpeg(index: u64, frame_rate: f64, bytes: &[u8]) -> Self {
        Self {
            index,
            timestamp: frame_index_to_seconds(index, frame_rate),
            data: Arc::from(STANDARD.encode(bytes)),
            format: FrameFormat::Jpeg,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Presentation time in seconds (`index / frame_rate`).
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// The base64 transport encoding of the image.
    pub fn base64(&self) -> &str {
        &self.data
    }

    /// A `data:` URL suitable for an `<img>` source.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), self.data)
    }

    /// Decode the transport encoding back into raw image bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, FramewiseError> {
        Ok(STANDARD.decode(self.data.as_bytes())?)
    }

    /// Decode the image into pixels.
    pub fn to_image(&self) -> Result<DynamicImage, FramewiseError> {
        let bytes = self.bytes()?;
        Ok(image::load_from_memory_with_format(
            &bytes,
            self.format.image_format(),
        )?)
    }

    /// Write the encoded image bytes to `path` unchanged.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FramewiseError> {
        std::fs::write(path, self.bytes()?)?;
        Ok(())
    }
}
