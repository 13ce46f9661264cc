//! Converting image samples into device pixels.

use crate::color::{Color, ColorSpace, ColorSpaceType, f32_to_u8};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::function::{DomainRange, lerp};
use crate::settings::ColorWarning;
use log::warn;
use pscolor_common::bit::{RowReader, max_value};
use smallvec::SmallVec;

/// A buffer of device pixels, with four bytes per pixel in B, G, R, A order.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub(crate) fn from_data(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);

        Self {
            width,
            height,
            data,
        }
    }

    /// The width of the pixmap.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height of the pixmap.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel data, row by row.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the pixmap and return its pixel data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The pixel at the given position.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let start = (y as usize * self.width as usize + x as usize) * 4;

        self.data
            .get(start..start + 4)
            .and_then(|p| p.try_into().ok())
    }

    pub(crate) fn pixels_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.data.chunks_exact_mut(4)
    }
}

impl std::fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pixmap {{ {}x{} }}", self.width, self.height)
    }
}

/// A color key mask, as used by images of type 4.
///
/// Pixels whose raw samples match the mask are transparent. The comparison happens before the
/// samples are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskColor(SmallVec<[(u32, u32); 4]>);

impl MaskColor {
    /// Create a new color key mask for an image with `num_components` components.
    ///
    /// `values` contains either one exact value or one `min max` range per component.
    pub fn new(values: &[u32], num_components: usize) -> Result<Self> {
        let ranges = if values.len() == num_components {
            values.iter().map(|v| (*v, *v)).collect()
        } else if values.len() == num_components * 2 {
            values.chunks_exact(2).map(|c| (c[0], c[1])).collect()
        } else {
            return Err(Error::RangeCheck);
        };

        Ok(Self(ranges))
    }

    fn num_components(&self) -> usize {
        self.0.len()
    }

    fn matches(&self, samples: &[u32]) -> bool {
        self.0
            .iter()
            .zip(samples)
            .all(|((min, max), s)| (*min..=*max).contains(s))
    }
}

/// A one-bit mask.
#[derive(Debug, Clone, Copy)]
pub struct StencilMask<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    polarity: bool,
}

impl<'a> StencilMask<'a> {
    /// Create a new stencil mask. If `polarity` is true, set bits mark the pixels that are
    /// painted, otherwise cleared bits do.
    pub fn new(data: &'a [u8], width: u32, height: u32, polarity: bool) -> Self {
        Self {
            data,
            width,
            height,
            polarity,
        }
    }

    /// Whether the mask pixel at the given position is painted. Missing data doesn't paint.
    fn paints(&self, x: u32, y: u32) -> bool {
        let stride = (self.width as usize).div_ceil(8);
        let byte = self.data.get(y as usize * stride + x as usize / 8);

        match byte {
            Some(byte) => ((byte >> (7 - x % 8)) & 1 == 1) == self.polarity,
            None => false,
        }
    }

    /// Whether the mask paints the pixel of an image with the given dimensions. The mask is
    /// scaled to the image with nearest-neighbor sampling.
    fn paints_scaled(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }

        let scale = |v: u32, from: u32, to: u32| {
            ((2 * v as u64 + 1) * to as u64 / (2 * from as u64)).min(to as u64 - 1) as u32
        };

        self.paints(
            scale(x, width, self.width),
            scale(y, height, self.height),
        )
    }

    fn required_bytes(&self) -> usize {
        (self.width as usize).div_ceil(8) * self.height as usize
    }
}

/// The samples of an image together with its parameters.
#[derive(Debug, Clone)]
pub struct ImageSource<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: ColorSpace,
    decode: Option<&'a [f32]>,
    mask_color: Option<MaskColor>,
    stencil_mask: Option<StencilMask<'a>>,
}

impl<'a> ImageSource<'a> {
    /// Create a new image source. Each row of `data` starts on a byte boundary.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        bits_per_component: u8,
        color_space: ColorSpace,
    ) -> Self {
        Self {
            data,
            width,
            height,
            bits_per_component,
            color_space,
            decode: None,
            mask_color: None,
            stencil_mask: None,
        }
    }

    /// Use a `Decode` array instead of the default decoding of the color space.
    pub fn with_decode(mut self, decode: &'a [f32]) -> Self {
        self.decode = Some(decode);
        self
    }

    /// Make all pixels matching the color key mask transparent.
    pub fn with_mask_color(mut self, mask_color: MaskColor) -> Self {
        self.mask_color = Some(mask_color);
        self
    }

    /// Make all pixels not painted by the stencil mask transparent.
    pub fn with_stencil_mask(mut self, mask: StencilMask<'a>) -> Self {
        self.stencil_mask = Some(mask);
        self
    }

    fn decode_ranges(&self) -> Result<DomainRange> {
        let n = self.color_space.num_components();

        let decode = match self.decode {
            Some(decode) => pairs_unordered(decode)?,
            None => self.color_space.default_decode(self.bits_per_component),
        };

        if decode.len() != n {
            return Err(Error::RangeCheck);
        }

        Ok(decode)
    }
}

/// Group a `Decode` array into pairs. Unlike function domains, inverted ranges are allowed.
fn pairs_unordered(values: &[f32]) -> Result<DomainRange> {
    if values.is_empty() || values.len() % 2 != 0 {
        return Err(Error::RangeCheck);
    }

    Ok(values.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

fn supported_bit_depth(color_space: &ColorSpace, bits_per_component: u8) -> bool {
    match color_space.inner() {
        ColorSpaceType::Indexed(_) => matches!(bits_per_component, 1 | 2 | 4 | 8 | 12),
        _ => matches!(bits_per_component, 1 | 2 | 4 | 8 | 12 | 16),
    }
}

/// Convert the samples of an image into a pixmap.
///
/// Returns an error for structurally invalid parameters and `None` if the bit depth isn't
/// supported for the color space, in which case the caller should fall back to a simpler way
/// of rendering the image.
pub fn convert_image(image: &ImageSource<'_>, ctx: &Context) -> Result<Option<Pixmap>> {
    let color_space = &image.color_space;
    let n = color_space.num_components();

    if image.width == 0 || image.height == 0 || n == 0 || color_space.is_pattern() {
        return Err(Error::RangeCheck);
    }

    let decode = image.decode_ranges()?;

    if let Some(mask_color) = &image.mask_color
        && mask_color.num_components() != n
    {
        return Err(Error::RangeCheck);
    }

    let bpc = image.bits_per_component;

    if !supported_bit_depth(color_space, bpc) {
        warn!("unsupported bit depth {bpc} for {} image", color_space.family().name());
        ctx.warn(ColorWarning::UnsupportedBitDepth);

        return Ok(None);
    }

    let width = image.width as usize;
    let height = image.height as usize;
    check_pixel_count(width, height, ctx)?;

    let samples_per_row = width.checked_mul(n).ok_or(Error::LimitCheck)?;
    let mut reader = RowReader::new(image.data, bpc, samples_per_row);
    let row_stride = reader.row_stride().max(1);

    // Only the rows that are backed by data are converted. All rows after them consist of
    // zero samples and share a single converted row.
    let data_rows = image.data.len().div_ceil(row_stride).min(height);
    let rows = if data_rows < height { data_rows + 1 } else { data_rows };

    if row_stride.saturating_mul(height) > image.data.len() {
        warn!("image data is too short, padding with zeroes");
        ctx.warn(ColorWarning::InsufficientData);
    }

    let mut raw = vec![0; rows * samples_per_row];

    for row in raw.chunks_exact_mut(samples_per_row).take(data_rows) {
        reader.read_row(row);
    }

    let rgb8 = icc_fast_path(image, &decode, &raw).unwrap_or_else(|| {
        let decoded = decode_samples(&raw, bpc, &decode);

        color_space
            .convert_bulk(&decoded, ctx)
            .iter()
            .flat_map(|c| c.map(f32_to_u8))
            .collect()
    });

    let alpha = if color_space.is_none() { 0 } else { 255 };
    let mut converted = rgb8
        .chunks_exact(3)
        .flat_map(|rgb| [rgb[2], rgb[1], rgb[0], alpha])
        .collect::<Vec<_>>();

    if let Some(mask_color) = &image.mask_color {
        for (pixel, samples) in converted.chunks_exact_mut(4).zip(raw.chunks_exact(n)) {
            if mask_color.matches(samples) {
                pixel[3] = 0;
            }
        }
    }

    let mut pixmap = Pixmap::new(image.width, image.height);
    let row_bytes = width * 4;

    for (y, row) in pixmap.data.chunks_exact_mut(row_bytes).enumerate() {
        let src = y.min(rows - 1) * row_bytes;
        row.copy_from_slice(&converted[src..src + row_bytes]);
    }

    if let Some(mask) = &image.stencil_mask {
        if mask.required_bytes() > mask.data.len() {
            warn!("stencil mask data is too short");
            ctx.warn(ColorWarning::InsufficientData);
        }

        apply_stencil_mask(&mut pixmap, mask);
    }

    Ok(Some(pixmap))
}

fn check_pixel_count(width: usize, height: usize, ctx: &Context) -> Result<()> {
    match width.checked_mul(height) {
        Some(pixels) if pixels <= ctx.settings.max_image_pixels => Ok(()),
        _ => {
            warn!("image with {width}x{height} pixels exceeds the pixel limit");

            Err(Error::LimitCheck)
        }
    }
}

/// Convert 8-bit samples of an `ICCBased` image with a single transform.
fn icc_fast_path(image: &ImageSource<'_>, decode: &DomainRange, raw: &[u32]) -> Option<Vec<u8>> {
    let ColorSpaceType::IccBased(icc) = image.color_space.inner() else {
        return None;
    };

    if image.bits_per_component != 8
        || !icc.supports_u8()
        || decode.iter().any(|d| *d != (0.0, 1.0))
    {
        return None;
    }

    let bytes = raw.iter().map(|s| *s as u8).collect::<Vec<_>>();

    icc.convert_u8(&bytes)
}

/// Map raw samples through the decode ranges.
///
/// Raw zero maps exactly to the minimum and the largest raw value exactly to the maximum.
fn decode_samples(raw: &[u32], bits_per_component: u8, decode: &DomainRange) -> Vec<f32> {
    let max = max_value(bits_per_component) as f32;
    let n = decode.len();

    // Images with small bit depths only have few distinct samples per component.
    let tables = (bits_per_component <= 12).then(|| {
        decode
            .iter()
            .map(|(min, max_d)| {
                (0..=max_value(bits_per_component))
                    .map(|v| lerp(v as f32 / max, *min, *max_d))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    });

    raw.iter()
        .enumerate()
        .map(|(i, v)| match &tables {
            Some(tables) => tables[i % n].get(*v as usize).copied().unwrap_or(0.0),
            None => {
                let (min, max_d) = decode[i % n];

                lerp(*v as f32 / max, min, max_d)
            }
        })
        .collect()
}

fn apply_stencil_mask(pixmap: &mut Pixmap, mask: &StencilMask<'_>) {
    let (width, height) = (pixmap.width, pixmap.height);

    for (i, pixel) in pixmap.pixels_mut().enumerate() {
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;

        if !mask.paints_scaled(x, y, width, height) {
            pixel[3] = 0;
        }
    }
}

/// Render a one-bit image mask, as painted by `imagemask`, with the given color.
///
/// Painted pixels have the color, all other pixels are transparent.
pub fn convert_image_mask(mask: &StencilMask<'_>, color: &Color, ctx: &Context) -> Result<Pixmap> {
    if mask.width == 0 || mask.height == 0 {
        return Err(Error::RangeCheck);
    }

    check_pixel_count(mask.width as usize, mask.height as usize, ctx)?;

    if mask.required_bytes() > mask.data.len() {
        warn!("image mask data is too short");
        ctx.warn(ColorWarning::InsufficientData);
    }

    let bgra = color.to_bgra8(ctx);
    let mut pixmap = Pixmap::new(mask.width, mask.height);
    let width = mask.width as usize;

    for (i, pixel) in pixmap.pixels_mut().enumerate() {
        if mask.paints((i % width) as u32, (i / width) as u32) {
            pixel.copy_from_slice(&bgra);
        }
    }

    Ok(pixmap)
}
