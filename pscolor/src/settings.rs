//! Settings and warnings of color conversion.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A callback function for resolving warnings during color conversion.
pub type WarningSinkFn = Arc<dyn Fn(ColorWarning) + Send + Sync>;

#[derive(Clone)]
/// Settings that should be applied when converting colors, images and shadings.
pub struct ColorSettings {
    /// The data of an ICC profile that should be used to convert `DeviceCMYK` colors
    /// in case no embedded profile is available.
    ///
    /// Finding such a profile (for example on the file system) is left to the caller. If
    /// no profile is provided, CMYK colors are converted using the naive device formulas.
    pub default_cmyk_profile: Option<Arc<[u8]>>,

    /// The maximum number of entries of the cache for single-color ICC conversions.
    ///
    /// When the cache is full, the oldest quarter of its entries is evicted.
    pub icc_color_cache_size: usize,

    /// The number of steps an axial or radial shading function is sampled with.
    pub gradient_steps: usize,

    /// The width and height of the raster function-based shadings are sampled into.
    pub function_raster_size: u16,

    /// The maximum number of pixels of a converted image or image mask.
    ///
    /// Larger images are rejected with [`Error::LimitCheck`](crate::Error::LimitCheck).
    pub max_image_pixels: usize,

    /// In certain cases, a warning will be emitted in case an issue was encountered while
    /// converting colors. Providing a callback allows you to catch those warnings and
    /// handle them, if desired.
    pub warning_sink: WarningSinkFn,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            default_cmyk_profile: None,
            icc_color_cache_size: 4096,
            gradient_steps: 64,
            function_raster_size: 256,
            max_image_pixels: 1 << 28,
            warning_sink: Arc::new(|_| {}),
        }
    }
}

impl Debug for ColorSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorSettings")
            .field(
                "default_cmyk_profile",
                &self.default_cmyk_profile.as_ref().map(|p| p.len()),
            )
            .field("icc_color_cache_size", &self.icc_color_cache_size)
            .field("gradient_steps", &self.gradient_steps)
            .field("function_raster_size", &self.function_raster_size)
            .field("max_image_pixels", &self.max_image_pixels)
            .finish_non_exhaustive()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Warnings that can occur while converting colors.
pub enum ColorWarning {
    /// An ICC profile could not be parsed or no transform could be built for it.
    ///
    /// The color is converted through the alternate color space instead.
    IccProfileUnusable,
    /// A function with an unsupported type was encountered. It evaluates to zeroes.
    UnsupportedFunctionType,
    /// Image data with a bit depth that is not supported for its color space was encountered.
    UnsupportedBitDepth,
    /// A tint transform or lookup procedure failed to run.
    ProcedureFailed,
    /// Sample data ended before all samples were read.
    InsufficientData,
}
