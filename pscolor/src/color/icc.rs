//! ICC based color spaces.
//!
//! Colors are converted with the first usable source of the following:
//!
//! 1. The embedded profile, if it can be parsed and a transform into sRGB can be built.
//! 2. For four-component spaces, the default CMYK profile of the [`ColorSettings`].
//! 3. The `Alternate` color space, or the device space with the same number of components.
//!
//! [`ColorSettings`]: crate::ColorSettings

use crate::color::{ColorComponents, ColorSpace, f32_to_u8};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::function::{DomainRange, interpolate, read_pairs};
use crate::object::Stream;
use crate::object::keys::{ALTERNATE, N, RANGE};
use log::warn;
use moxcms::{
    ColorProfile, DataColorSpace, Layout, Transform8BitExecutor, TransformF32BitExecutor,
    TransformOptions,
};
use smallvec::smallvec;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

struct IccRepr {
    hash: u128,
    transform_u8: Box<Transform8BitExecutor>,
    transform_f32: Box<TransformF32BitExecutor>,
    number_components: usize,
    is_srgb: bool,
    is_lab: bool,
}

/// A transform from an ICC profile into sRGB.
#[derive(Clone)]
pub(crate) struct IccProfile(Arc<IccRepr>);

impl Debug for IccProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IccProfile {{ components: {} }}", self.0.number_components)
    }
}

impl IccProfile {
    pub(crate) fn new(
        hash: u128,
        data: &[u8],
        profile: &ColorProfile,
        number_components: usize,
    ) -> Option<Self> {
        const SRGB_MARKER: &[u8] = b"sRGB";

        let expected = match profile.color_space {
            DataColorSpace::Gray => Some(1),
            DataColorSpace::Rgb | DataColorSpace::Lab => Some(3),
            DataColorSpace::Cmyk => Some(4),
            _ => None,
        };

        if expected.is_some_and(|e| e != number_components) {
            warn!("ICC profile doesn't have {number_components} components");

            return None;
        }

        let src_layout = match number_components {
            1 => Layout::Gray,
            3 => Layout::Rgb,
            4 => Layout::Rgba,
            _ => {
                warn!("unsupported number of components {number_components} for ICC profile");

                return None;
            }
        };

        let dest_profile = ColorProfile::new_srgb();

        let transform_u8 = profile
            .create_transform_8bit(
                src_layout,
                &dest_profile,
                Layout::Rgb,
                TransformOptions::default(),
            )
            .ok()?;

        let transform_f32 = profile
            .create_transform_f32(
                src_layout,
                &dest_profile,
                Layout::Rgb,
                TransformOptions::default(),
            )
            .ok()?;

        let is_srgb = number_components == 3
            && data
                .get(52..56)
                .map(|device_model| device_model == SRGB_MARKER)
                .unwrap_or(false);
        let is_lab = profile.color_space == DataColorSpace::Lab;

        Some(Self(Arc::new(IccRepr {
            hash,
            transform_u8,
            transform_f32,
            number_components,
            is_srgb,
            is_lab,
        })))
    }

    pub(crate) fn hash(&self) -> u128 {
        self.0.hash
    }

    pub(crate) fn number_components(&self) -> usize {
        self.0.number_components
    }

    pub(crate) fn is_srgb(&self) -> bool {
        self.0.is_srgb
    }

    pub(crate) fn is_lab(&self) -> bool {
        self.0.is_lab
    }

    /// Convert normalized components, `number_components` per color, to RGB.
    pub(crate) fn convert_f32(&self, input: &[f32]) -> Option<Vec<[f32; 3]>> {
        let n = self.number_components();
        let input = &input[..input.len() - input.len() % n];

        if self.is_srgb() {
            return Some(
                input
                    .chunks_exact(3)
                    .map(|c| [c[0], c[1], c[2]])
                    .collect(),
            );
        }

        let mut output = vec![0.0_f32; input.len() / n * 3];
        self.0.transform_f32.transform(input, &mut output).ok()?;

        Some(
            output
                .chunks_exact(3)
                .map(|c| [clamp_unit(c[0]), clamp_unit(c[1]), clamp_unit(c[2])])
                .collect(),
        )
    }

    /// Convert 8-bit components to 8-bit RGB.
    pub(crate) fn convert_u8(&self, input: &[u8]) -> Option<Vec<u8>> {
        let n = self.number_components();
        let input = &input[..input.len() - input.len() % n];

        if self.is_srgb() {
            return Some(input.to_vec());
        }

        let mut output = vec![0; input.len() / n * 3];
        self.0.transform_u8.transform(input, &mut output).ok()?;

        Some(output)
    }

    /// Convert a single color with normalized components, using the color cache of the
    /// context.
    ///
    /// Components are quantized to 8 bit before the conversion, so a cached color is the
    /// same as a freshly converted one.
    pub(crate) fn convert_color(&self, input: &[f32], ctx: &Context) -> Option<[f32; 3]> {
        let n = self.number_components();
        let mut quantized = [0; 4];

        for (q, v) in quantized.iter_mut().zip(input.iter().take(n)) {
            *q = f32_to_u8(clamp_unit(*v));
        }

        let key = (self.hash(), n as u8, quantized);

        if let Some(rgb) = ctx.cache.cached_color(&key) {
            return Some(rgb);
        }

        let normalized = quantized[..n]
            .iter()
            .map(|q| *q as f32 / 255.0)
            .collect::<Vec<_>>();
        let rgb = *self.convert_f32(&normalized)?.first()?;

        ctx.cache.insert_color(key, rgb);

        Some(rgb)
    }
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// An `ICCBased` color space.
#[derive(Debug, Clone)]
pub(crate) struct IccBased {
    profile: Option<IccProfile>,
    alternate: ColorSpace,
    range: DomainRange,
}

impl IccBased {
    pub(crate) fn new(stream: &Stream, ctx: &Context, depth: usize) -> Result<Self> {
        let dict = stream.dict();

        let n = match dict.get_object(N) {
            Some(n) => n.cast::<usize>().ok_or(Error::TypeCheck)?,
            None => return Err(Error::Undefined),
        };

        if !matches!(n, 1 | 3 | 4) {
            return Err(Error::RangeCheck);
        }

        let range = read_pairs(dict, RANGE)?.unwrap_or_else(|| smallvec![(0.0, 1.0); n]);

        if range.len() != n {
            return Err(Error::RangeCheck);
        }

        let alternate = match dict.get_object(ALTERNATE) {
            Some(alternate) => {
                let alternate = ColorSpace::new_inner(alternate, ctx, depth + 1)?;

                if alternate.is_pattern() || alternate.num_components() != n {
                    return Err(Error::RangeCheck);
                }

                alternate
            }
            None => ColorSpace::device_for_components(n),
        };

        let profile = ctx.embedded_profile(stream, n).or_else(|| {
            if n == 4 {
                ctx.default_cmyk_profile()
            } else {
                None
            }
        });

        Ok(Self {
            profile,
            alternate,
            range,
        })
    }

    pub(crate) fn num_components(&self) -> usize {
        self.range.len()
    }

    pub(crate) fn range(&self) -> &DomainRange {
        &self.range
    }

    pub(crate) fn alternate(&self) -> &ColorSpace {
        &self.alternate
    }

    /// Whether the space has a usable profile that is known to be sRGB.
    pub(crate) fn is_srgb(&self) -> bool {
        self.profile.as_ref().is_some_and(IccProfile::is_srgb)
    }

    /// Whether the 8-bit fast path can be used for samples decoded with the default range.
    pub(crate) fn supports_u8(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| !p.is_lab())
            && self.range.iter().all(|r| *r == (0.0, 1.0))
    }

    pub(crate) fn to_rgb(&self, components: &[f32], ctx: &Context) -> [f32; 3] {
        if let Some(profile) = &self.profile {
            let normalized = self.normalize(profile, components);

            if let Some(rgb) = profile.convert_color(&normalized, ctx) {
                return rgb;
            }
        }

        self.alternate.to_rgb(components, ctx)
    }

    /// Convert many colors, `num_components` per color.
    pub(crate) fn convert_bulk(&self, input: &[f32], ctx: &Context) -> Vec<[f32; 3]> {
        let n = self.num_components();

        if let Some(profile) = &self.profile {
            let normalized = input
                .chunks_exact(n)
                .flat_map(|c| self.normalize(profile, c))
                .collect::<Vec<_>>();

            if let Some(rgb) = profile.convert_f32(&normalized) {
                return rgb;
            }
        }

        self.alternate.convert_bulk(input, ctx)
    }

    /// Convert many 8-bit colors to 8-bit RGB. Returns `None` if no profile is available.
    pub(crate) fn convert_u8(&self, input: &[u8]) -> Option<Vec<u8>> {
        self.profile.as_ref()?.convert_u8(input)
    }

    fn normalize(&self, profile: &IccProfile, components: &[f32]) -> ColorComponents {
        if profile.is_lab() {
            return normalize_lab(components);
        }

        self.range
            .iter()
            .enumerate()
            .map(|(i, (min, max))| {
                let v = components.get(i).copied().unwrap_or(*min);

                clamp_unit(interpolate(v, *min, *max, 0.0, 1.0))
            })
            .collect()
    }
}

/// Map L*a*b* values into the unit range moxcms expects.
fn normalize_lab(components: &[f32]) -> ColorComponents {
    let get = |i: usize| components.get(i).copied().unwrap_or(0.0);

    smallvec![
        clamp_unit(get(0) * (1.0 / 100.0)),
        clamp_unit((get(1) + 128.0) * (1.0 / 255.0)),
        clamp_unit((get(2) + 128.0) * (1.0 / 255.0)),
    ]
}
