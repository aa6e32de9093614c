//! Device thumbnail profiles
//!
//! A device profile names one thumbnail rendition: the dpi to rasterize at,
//! the target pixel dimensions, the encoding quality and the output format.
//! Every document gets one thumbnail file per profile inside its bucket.

use serde::{Deserialize, Serialize};

/// Thumbnail output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl ImageOutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageOutputFormat::Jpeg => "image/jpeg",
            ImageOutputFormat::Png => "image/png",
            ImageOutputFormat::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageOutputFormat::Jpeg => "jpeg",
            ImageOutputFormat::Png => "png",
            ImageOutputFormat::Webp => "webp",
        }
    }
}

/// One named thumbnail configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Profile name, used as the thumbnail file stem
    pub device: String,
    /// Rasterization resolution
    pub dpi: u32,
    /// Encoding quality (JPEG)
    pub quality: u8,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Output encoding
    pub format: ImageOutputFormat,
}

impl DeviceProfile {
    /// JPEG profile with the library-wide dpi and quality defaults
    pub fn jpeg(device: &str, width: u32, height: u32) -> Self {
        Self {
            device: device.to_string(),
            dpi: 150,
            quality: 85,
            width,
            height,
            format: ImageOutputFormat::Jpeg,
        }
    }

    /// File name of this profile's thumbnail inside a bucket directory
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.device, self.format.extension())
    }
}

/// The built-in profile set
pub fn default_profiles() -> Vec<DeviceProfile> {
    vec![
        DeviceProfile::jpeg("desktop", 170, 240),
        DeviceProfile::jpeg("laptop", 150, 212),
        DeviceProfile::jpeg("tablet", 140, 198),
        DeviceProfile::jpeg("mobile", 120, 170),
    ]
}
