//! Color spaces and colors.

mod cie;
pub mod device;
pub(crate) mod icc;
mod indexed;
mod tint;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::function::DomainRange;
use crate::object::keys::*;
use crate::object::{Name, Object};
use cie::{CieBased, CieFamily};
use device::{
    cmyk_to_gray, cmyk_to_rgb, gray_to_cmyk, gray_to_rgb, hsb_to_rgb, rgb_to_cmyk_with,
    rgb_to_gray, rgb_to_hsb,
};
use icc::IccBased;
use indexed::Indexed;
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};
use std::sync::{Arc, LazyLock};
use tint::{DeviceN, Separation};

/// A storage for the components of colors.
pub type ColorComponents = SmallVec<[f32; 4]>;

/// The maximum number of colorants of a `DeviceN` space.
pub(crate) const MAX_COMPONENTS: usize = 32;

/// The maximum nesting depth of color spaces, like an `Indexed` space with a `Separation`
/// base.
const MAX_DEPTH: usize = 8;

/// The family of a color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpaceFamily {
    /// `DeviceGray`.
    DeviceGray,
    /// `DeviceRGB`.
    DeviceRgb,
    /// `DeviceCMYK`.
    DeviceCmyk,
    /// `CIEBasedA`.
    CieBasedA,
    /// `CIEBasedABC`.
    CieBasedAbc,
    /// `CIEBasedDEF`.
    CieBasedDef,
    /// `CIEBasedDEFG`.
    CieBasedDefg,
    /// `ICCBased`.
    IccBased,
    /// `Indexed`.
    Indexed,
    /// `Separation`.
    Separation,
    /// `DeviceN`.
    DeviceN,
    /// `Pattern`.
    Pattern,
}

impl ColorSpaceFamily {
    /// The PostScript name of the family.
    pub fn name(self) -> &'static str {
        match self {
            Self::DeviceGray => DEVICE_GRAY,
            Self::DeviceRgb => DEVICE_RGB,
            Self::DeviceCmyk => DEVICE_CMYK,
            Self::CieBasedA => CIE_BASED_A,
            Self::CieBasedAbc => CIE_BASED_ABC,
            Self::CieBasedDef => CIE_BASED_DEF,
            Self::CieBasedDefg => CIE_BASED_DEFG,
            Self::IccBased => ICC_BASED,
            Self::Indexed => INDEXED,
            Self::Separation => SEPARATION,
            Self::DeviceN => DEVICE_N,
            Self::Pattern => PATTERN,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ColorSpaceType {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CieBased(CieBased),
    IccBased(IccBased),
    Indexed(Indexed),
    Separation(Separation),
    DeviceN(DeviceN),
    Pattern(Option<ColorSpace>),
}

static DEVICE_GRAY_SPACE: LazyLock<ColorSpace> =
    LazyLock::new(|| ColorSpace(Arc::new(ColorSpaceType::DeviceGray)));
static DEVICE_RGB_SPACE: LazyLock<ColorSpace> =
    LazyLock::new(|| ColorSpace(Arc::new(ColorSpaceType::DeviceRgb)));
static DEVICE_CMYK_SPACE: LazyLock<ColorSpace> =
    LazyLock::new(|| ColorSpace(Arc::new(ColorSpaceType::DeviceCmyk)));

/// A color space.
///
/// Color spaces are validated when they are created and cheap to clone.
#[derive(Debug, Clone)]
pub struct ColorSpace(Arc<ColorSpaceType>);

impl ColorSpace {
    /// Create a new color space from a name or a color space array.
    ///
    /// Returns an error if the description is structurally invalid, with the PostScript
    /// error a `setcolorspace` operator should raise.
    pub fn new(object: &Object, ctx: &Context) -> Result<Self> {
        Self::new_inner(object, ctx, 0)
    }

    pub(crate) fn new_inner(object: &Object, ctx: &Context, depth: usize) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(Error::LimitCheck);
        }

        let array = match object {
            Object::Name(name) => return Self::new_from_name(name),
            Object::Array(array) => array,
            _ => return Err(Error::TypeCheck),
        };

        let family = array
            .first()
            .ok_or(Error::RangeCheck)?
            .as_name()
            .ok_or(Error::TypeCheck)?;

        let cie = |family: CieFamily| -> Result<ColorSpaceType> {
            let [_, dict] = array.as_ref() else {
                return Err(Error::RangeCheck);
            };
            let dict = dict.as_dict().ok_or(Error::TypeCheck)?;

            Ok(ColorSpaceType::CieBased(CieBased::new(family, dict)?))
        };

        let inner = match family.as_str() {
            DEVICE_GRAY | DEVICE_RGB | DEVICE_CMYK => {
                if array.len() != 1 {
                    return Err(Error::RangeCheck);
                }

                return Self::new_from_name(family);
            }
            CIE_BASED_A => cie(CieFamily::A)?,
            CIE_BASED_ABC => cie(CieFamily::Abc)?,
            CIE_BASED_DEF => cie(CieFamily::Def)?,
            CIE_BASED_DEFG => cie(CieFamily::Defg)?,
            ICC_BASED => {
                let [_, stream] = array.as_ref() else {
                    return Err(Error::RangeCheck);
                };
                let stream = stream.as_stream().ok_or(Error::TypeCheck)?;

                ColorSpaceType::IccBased(IccBased::new(stream, ctx, depth)?)
            }
            INDEXED => ColorSpaceType::Indexed(Indexed::new(array, ctx, depth)?),
            SEPARATION => ColorSpaceType::Separation(Separation::new(array, ctx, depth)?),
            DEVICE_N => ColorSpaceType::DeviceN(DeviceN::new(array, ctx, depth)?),
            PATTERN => match array.as_ref() {
                [_] => ColorSpaceType::Pattern(None),
                [_, underlying] => {
                    let underlying = Self::new_inner(underlying, ctx, depth + 1)?;

                    if underlying.is_pattern() {
                        return Err(Error::RangeCheck);
                    }

                    ColorSpaceType::Pattern(Some(underlying))
                }
                _ => return Err(Error::RangeCheck),
            },
            _ => return Err(Error::Undefined),
        };

        Ok(Self(Arc::new(inner)))
    }

    /// Create a new color space from a family name. Only families without parameters can
    /// be created like this.
    pub fn new_from_name(name: &Name) -> Result<Self> {
        match name.as_str() {
            DEVICE_GRAY => Ok(Self::device_gray()),
            DEVICE_RGB => Ok(Self::device_rgb()),
            DEVICE_CMYK => Ok(Self::device_cmyk()),
            PATTERN => Ok(Self::pattern()),
            CIE_BASED_A | CIE_BASED_ABC | CIE_BASED_DEF | CIE_BASED_DEFG | ICC_BASED
            | INDEXED | SEPARATION | DEVICE_N => Err(Error::RangeCheck),
            _ => Err(Error::Undefined),
        }
    }

    /// Return the device gray color space.
    pub fn device_gray() -> Self {
        DEVICE_GRAY_SPACE.clone()
    }

    /// Return the device RGB color space.
    pub fn device_rgb() -> Self {
        DEVICE_RGB_SPACE.clone()
    }

    /// Return the device CMYK color space.
    pub fn device_cmyk() -> Self {
        DEVICE_CMYK_SPACE.clone()
    }

    /// Return a pattern color space without an underlying color space.
    pub fn pattern() -> Self {
        Self(Arc::new(ColorSpaceType::Pattern(None)))
    }

    /// The device space with the given number of components.
    pub(crate) fn device_for_components(n: usize) -> Self {
        match n {
            3 => Self::device_rgb(),
            4 => Self::device_cmyk(),
            _ => Self::device_gray(),
        }
    }

    /// The family of the color space.
    pub fn family(&self) -> ColorSpaceFamily {
        match self.0.as_ref() {
            ColorSpaceType::DeviceGray => ColorSpaceFamily::DeviceGray,
            ColorSpaceType::DeviceRgb => ColorSpaceFamily::DeviceRgb,
            ColorSpaceType::DeviceCmyk => ColorSpaceFamily::DeviceCmyk,
            ColorSpaceType::CieBased(c) => match c.family() {
                CieFamily::A => ColorSpaceFamily::CieBasedA,
                CieFamily::Abc => ColorSpaceFamily::CieBasedAbc,
                CieFamily::Def => ColorSpaceFamily::CieBasedDef,
                CieFamily::Defg => ColorSpaceFamily::CieBasedDefg,
            },
            ColorSpaceType::IccBased(_) => ColorSpaceFamily::IccBased,
            ColorSpaceType::Indexed(_) => ColorSpaceFamily::Indexed,
            ColorSpaceType::Separation(_) => ColorSpaceFamily::Separation,
            ColorSpaceType::DeviceN(_) => ColorSpaceFamily::DeviceN,
            ColorSpaceType::Pattern(_) => ColorSpaceFamily::Pattern,
        }
    }

    pub(crate) fn inner(&self) -> &ColorSpaceType {
        &self.0
    }

    /// Whether the color space is a pattern color space.
    pub fn is_pattern(&self) -> bool {
        matches!(self.0.as_ref(), ColorSpaceType::Pattern(_))
    }

    /// Whether the color space is an indexed color space.
    pub fn is_indexed(&self) -> bool {
        matches!(self.0.as_ref(), ColorSpaceType::Indexed(_))
    }

    /// Whether the color space is a `Separation` or `DeviceN` space.
    pub(crate) fn is_special(&self) -> bool {
        matches!(
            self.0.as_ref(),
            ColorSpaceType::Separation(_) | ColorSpaceType::DeviceN(_)
        )
    }

    /// Whether painting in the color space produces no visible output, which is the case for
    /// the `None` colorant.
    pub fn is_none(&self) -> bool {
        match self.0.as_ref() {
            ColorSpaceType::Separation(s) => s.is_none(),
            ColorSpaceType::DeviceN(d) => d.is_none(),
            _ => false,
        }
    }

    /// The underlying color space of a pattern color space.
    pub fn pattern_underlying(&self) -> Option<&Self> {
        match self.0.as_ref() {
            ColorSpaceType::Pattern(underlying) => underlying.as_ref(),
            _ => None,
        }
    }

    /// The names of the colorants of a `Separation` or `DeviceN` space.
    pub fn colorants(&self) -> &[Name] {
        match self.0.as_ref() {
            ColorSpaceType::Separation(s) => std::slice::from_ref(s.colorant()),
            ColorSpaceType::DeviceN(d) => d.colorants(),
            _ => &[],
        }
    }

    /// Whether the color space is a `Separation` space for the `All` colorant.
    pub fn is_all_separation(&self) -> bool {
        matches!(self.0.as_ref(), ColorSpaceType::Separation(s) if s.is_all())
    }

    /// The alternate space of an `ICCBased`, `Separation` or `DeviceN` space, or the base of
    /// an `Indexed` space.
    pub fn base(&self) -> Option<&Self> {
        match self.0.as_ref() {
            ColorSpaceType::IccBased(i) => Some(i.alternate()),
            ColorSpaceType::Indexed(i) => Some(i.base()),
            ColorSpaceType::Separation(s) => Some(s.alternate()),
            ColorSpaceType::DeviceN(d) => Some(d.alternate()),
            ColorSpaceType::Pattern(p) => p.as_ref(),
            _ => None,
        }
    }

    /// The number of components of colors in the space.
    ///
    /// A pattern space without an underlying space has no components.
    pub fn num_components(&self) -> usize {
        match self.0.as_ref() {
            ColorSpaceType::DeviceGray => 1,
            ColorSpaceType::DeviceRgb => 3,
            ColorSpaceType::DeviceCmyk => 4,
            ColorSpaceType::CieBased(c) => c.num_components(),
            ColorSpaceType::IccBased(i) => i.num_components(),
            ColorSpaceType::Indexed(_) => 1,
            ColorSpaceType::Separation(_) => 1,
            ColorSpaceType::DeviceN(d) => d.num_components(),
            ColorSpaceType::Pattern(p) => p.as_ref().map(Self::num_components).unwrap_or(0),
        }
    }

    /// The color a graphics state starts with after selecting the space.
    pub fn initial_color(&self) -> ColorComponents {
        match self.0.as_ref() {
            ColorSpaceType::DeviceGray => smallvec![0.0],
            ColorSpaceType::DeviceRgb => smallvec![0.0, 0.0, 0.0],
            ColorSpaceType::DeviceCmyk => smallvec![0.0, 0.0, 0.0, 1.0],
            ColorSpaceType::CieBased(_) | ColorSpaceType::IccBased(_) => self
                .component_ranges()
                .iter()
                .map(|(min, max)| 0.0f32.clamp(*min, *max))
                .collect(),
            ColorSpaceType::Indexed(_) => smallvec![0.0],
            ColorSpaceType::Separation(_) => smallvec![1.0],
            ColorSpaceType::DeviceN(d) => smallvec![1.0; d.num_components()],
            ColorSpaceType::Pattern(p) => {
                p.as_ref().map(Self::initial_color).unwrap_or_default()
            }
        }
    }

    /// The valid range of each component.
    pub fn component_ranges(&self) -> DomainRange {
        match self.0.as_ref() {
            ColorSpaceType::CieBased(c) => c.ranges().clone(),
            ColorSpaceType::IccBased(i) => i.range().clone(),
            ColorSpaceType::Indexed(i) => smallvec![(0.0, i.hival() as f32)],
            ColorSpaceType::Pattern(p) => {
                p.as_ref().map(Self::component_ranges).unwrap_or_default()
            }
            _ => smallvec![(0.0, 1.0); self.num_components()],
        }
    }

    /// The default decode array of images with the given bit depth in this space.
    pub fn default_decode(&self, bits_per_component: u8) -> DomainRange {
        match self.0.as_ref() {
            ColorSpaceType::Indexed(_) => {
                let max = pscolor_common::bit::max_value(bits_per_component) as f32;

                smallvec![(0.0, max)]
            }
            _ => self.component_ranges(),
        }
    }

    /// Clamp the components of a color to their valid ranges.
    pub fn clamp_components(&self, components: &mut [f32]) {
        for (c, (min, max)) in components.iter_mut().zip(self.component_ranges()) {
            *c = if c.is_nan() { min } else { c.clamp(min, max) };
        }
    }

    /// Convert a color in this space to RGB.
    ///
    /// Missing components are treated as zero, surplus components are ignored.
    pub fn to_rgb(&self, components: &[f32], ctx: &Context) -> [f32; 3] {
        let get = |i: usize| unit(components.get(i).copied().unwrap_or(0.0));

        match self.0.as_ref() {
            ColorSpaceType::DeviceGray => gray_to_rgb(get(0)),
            ColorSpaceType::DeviceRgb => [get(0), get(1), get(2)],
            ColorSpaceType::DeviceCmyk => {
                let cmyk = [get(0), get(1), get(2), get(3)];

                ctx.default_cmyk_profile()
                    .and_then(|p| p.convert_color(&cmyk, ctx))
                    .unwrap_or_else(|| cmyk_to_rgb(cmyk))
            }
            ColorSpaceType::CieBased(c) => c.to_rgb(components, ctx),
            ColorSpaceType::IccBased(i) => i.to_rgb(components, ctx),
            ColorSpaceType::Indexed(i) => i.to_rgb(components, ctx),
            ColorSpaceType::Separation(s) => {
                s.alternate().to_rgb(&s.to_alternate(components, ctx), ctx)
            }
            ColorSpaceType::DeviceN(d) => {
                d.alternate().to_rgb(&d.to_alternate(components, ctx), ctx)
            }
            ColorSpaceType::Pattern(p) => p
                .as_ref()
                .map(|p| p.to_rgb(components, ctx))
                .unwrap_or([0.0; 3]),
        }
    }

    /// Convert many colors to RGB, `num_components` values per color.
    ///
    /// The values are expected to already be decoded into the ranges of the components.
    pub(crate) fn convert_bulk(&self, input: &[f32], ctx: &Context) -> Vec<[f32; 3]> {
        let n = self.num_components().max(1);

        match self.0.as_ref() {
            ColorSpaceType::DeviceGray => input.iter().map(|g| gray_to_rgb(unit(*g))).collect(),
            ColorSpaceType::DeviceRgb => input
                .chunks_exact(3)
                .map(|c| [unit(c[0]), unit(c[1]), unit(c[2])])
                .collect(),
            ColorSpaceType::DeviceCmyk => {
                let clamped = input.iter().map(|v| unit(*v)).collect::<Vec<_>>();

                ctx.default_cmyk_profile()
                    .and_then(|p| p.convert_f32(&clamped))
                    .unwrap_or_else(|| {
                        clamped
                            .chunks_exact(4)
                            .map(|c| cmyk_to_rgb([c[0], c[1], c[2], c[3]]))
                            .collect()
                    })
            }
            ColorSpaceType::CieBased(c) => c.convert_bulk(input, ctx),
            ColorSpaceType::IccBased(i) => i.convert_bulk(input, ctx),
            ColorSpaceType::Indexed(i) => i.convert_bulk(input, ctx),
            _ => {
                let mut converter = ColorConverter::new(self);

                input
                    .chunks_exact(n)
                    .map(|c| converter.to_rgb(c, ctx))
                    .collect()
            }
        }
    }
}

/// Converts colors of one color space to RGB, remembering the result for every distinct
/// color.
///
/// Shadings and images in `Separation` and `DeviceN` spaces use few distinct colors, but
/// each conversion runs a tint transform.
pub(crate) struct ColorConverter<'a> {
    color_space: &'a ColorSpace,
    converted: FxHashMap<SmallVec<[u32; 4]>, [f32; 3]>,
}

impl<'a> ColorConverter<'a> {
    pub(crate) fn new(color_space: &'a ColorSpace) -> Self {
        Self {
            color_space,
            converted: FxHashMap::default(),
        }
    }

    pub(crate) fn to_rgb(&mut self, components: &[f32], ctx: &Context) -> [f32; 3] {
        let key = components.iter().map(|c| c.to_bits()).collect();

        *self
            .converted
            .entry(key)
            .or_insert_with(|| self.color_space.to_rgb(components, ctx))
    }
}

/// A color.
#[derive(Debug, Clone)]
pub struct Color {
    color_space: ColorSpace,
    components: ColorComponents,
}

impl Color {
    /// Create a new color.
    ///
    /// The components are clamped to the ranges of the color space. Missing components are
    /// taken from the initial color of the space, surplus ones are dropped.
    pub fn new(color_space: ColorSpace, components: &[f32]) -> Self {
        let mut all = color_space.initial_color();

        for (c, v) in all.iter_mut().zip(components) {
            *c = *v;
        }

        color_space.clamp_components(&mut all);

        Self {
            color_space,
            components: all,
        }
    }

    /// The initial color of a color space.
    pub fn initial(color_space: ColorSpace) -> Self {
        let components = color_space.initial_color();

        Self {
            color_space,
            components,
        }
    }

    /// Create a `DeviceGray` color.
    pub fn gray(gray: f32) -> Self {
        Self::new(ColorSpace::device_gray(), &[gray])
    }

    /// Create a `DeviceRGB` color.
    pub fn rgb(rgb: [f32; 3]) -> Self {
        Self::new(ColorSpace::device_rgb(), &rgb)
    }

    /// Create a `DeviceCMYK` color.
    pub fn cmyk(cmyk: [f32; 4]) -> Self {
        Self::new(ColorSpace::device_cmyk(), &cmyk)
    }

    /// Create a `DeviceRGB` color from hue, saturation and brightness.
    pub fn hsb(hsb: [f32; 3]) -> Self {
        let hsb = hsb.map(unit);

        Self::rgb(hsb_to_rgb(hsb))
    }

    /// The color space of the color.
    pub fn color_space(&self) -> &ColorSpace {
        &self.color_space
    }

    /// The components of the color.
    pub fn components(&self) -> &[f32] {
        &self.components
    }

    /// Whether painting with the color produces no visible output.
    pub fn is_none(&self) -> bool {
        self.color_space.is_none()
    }

    /// Convert the color to RGB.
    pub fn to_rgb(&self, ctx: &Context) -> [f32; 3] {
        self.color_space.to_rgb(&self.components, ctx)
    }

    /// Convert the color to a device pixel in B, G, R, A order.
    ///
    /// Colors that produce no visible output are fully transparent.
    pub fn to_bgra8(&self, ctx: &Context) -> [u8; 4] {
        let [r, g, b] = self.to_rgb(ctx);
        let alpha = if self.is_none() { 0 } else { 255 };

        [f32_to_u8(b), f32_to_u8(g), f32_to_u8(r), alpha]
    }

    /// The gray level of the color, like `currentgray`.
    pub fn current_gray(&self, ctx: &Context) -> f32 {
        match self.color_space.inner() {
            ColorSpaceType::DeviceGray => self.components[0],
            ColorSpaceType::DeviceCmyk => cmyk_to_gray(self.device_cmyk()),
            _ => rgb_to_gray(self.current_rgb(ctx)),
        }
    }

    /// The RGB components of the color, like `currentrgbcolor`.
    pub fn current_rgb(&self, ctx: &Context) -> [f32; 3] {
        match self.color_space.inner() {
            ColorSpaceType::DeviceGray => gray_to_rgb(self.components[0]),
            ColorSpaceType::DeviceRgb => self.device_rgb(),
            ColorSpaceType::DeviceCmyk => cmyk_to_rgb(self.device_cmyk()),
            _ => self.to_rgb(ctx),
        }
    }

    /// The CMYK components of the color, like `currentcmykcolor`.
    pub fn current_cmyk(&self, ctx: &Context) -> [f32; 4] {
        self.current_cmyk_with(ctx, |k| k, |k| k)
    }

    /// The CMYK components of the color, with custom black generation and undercolor
    /// removal for colors that need to be converted from RGB.
    pub fn current_cmyk_with(
        &self,
        ctx: &Context,
        black_generation: impl Fn(f32) -> f32,
        undercolor_removal: impl Fn(f32) -> f32,
    ) -> [f32; 4] {
        match self.color_space.inner() {
            ColorSpaceType::DeviceGray => gray_to_cmyk(self.components[0]),
            ColorSpaceType::DeviceCmyk => self.device_cmyk(),
            _ => rgb_to_cmyk_with(self.current_rgb(ctx), black_generation, undercolor_removal),
        }
    }

    /// The hue, saturation and brightness of the color, like `currenthsbcolor`.
    pub fn current_hsb(&self, ctx: &Context) -> [f32; 3] {
        rgb_to_hsb(self.current_rgb(ctx))
    }

    fn device_rgb(&self) -> [f32; 3] {
        let get = |i: usize| self.components.get(i).copied().unwrap_or(0.0);

        [get(0), get(1), get(2)]
    }

    fn device_cmyk(&self) -> [f32; 4] {
        let get = |i: usize| self.components.get(i).copied().unwrap_or(0.0);

        [get(0), get(1), get(2), get(3)]
    }
}

/// Clamp a value to `[0, 1]`, mapping NaN to 0.
#[inline]
pub(crate) fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[inline(always)]
pub(crate) fn f32_to_u8(val: f32) -> u8 {
    (val * 255.0 + 0.5) as u8
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::settings::{ColorSettings, ColorWarning};
    use std::sync::Mutex;

    pub(crate) fn rgb_close(a: [f32; 3], b: [f32; 3]) {
        for (a1, b1) in a.iter().zip(b) {
            assert!((a1 - b1).abs() < 2e-3, "{a:?} != {b:?}");
        }
    }

    pub(crate) fn collecting_context() -> (Context, Arc<Mutex<Vec<ColorWarning>>>) {
        let warnings = Arc::new(Mutex::new(vec![]));
        let sink = warnings.clone();

        let settings = ColorSettings {
            warning_sink: Arc::new(move |w| sink.lock().unwrap().push(w)),
            ..ColorSettings::default()
        };

        (Context::new(settings), warnings)
    }

    fn array(items: &[&str]) -> Object {
        Object::array(items.iter().map(|i| Object::name(i)))
    }

    #[test]
    fn device_spaces() {
        let ctx = Context::default();

        for (name, n) in [(DEVICE_GRAY, 1), (DEVICE_RGB, 3), (DEVICE_CMYK, 4)] {
            let by_name = ColorSpace::new(&Object::name(name), &ctx).unwrap();
            let by_array = ColorSpace::new(&array(&[name]), &ctx).unwrap();

            assert_eq!(by_name.num_components(), n);
            assert_eq!(by_array.family(), by_name.family());
            assert_eq!(by_name.family().name(), name);
        }

        assert_eq!(
            ColorSpace::device_cmyk().initial_color().as_slice(),
            &[0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn structural_validation() {
        let ctx = Context::default();

        assert_eq!(
            ColorSpace::new(&array(&[DEVICE_RGB, DEVICE_RGB]), &ctx).unwrap_err(),
            Error::RangeCheck
        );
        assert_eq!(
            ColorSpace::new(&Object::name("CalRGB"), &ctx).unwrap_err(),
            Error::Undefined
        );
        assert_eq!(
            ColorSpace::new(&Object::name(SEPARATION), &ctx).unwrap_err(),
            Error::RangeCheck
        );
        assert_eq!(
            ColorSpace::new(&Object::array([]), &ctx).unwrap_err(),
            Error::RangeCheck
        );
        assert_eq!(
            ColorSpace::new(&Object::Number(1.0), &ctx).unwrap_err(),
            Error::TypeCheck
        );
        assert_eq!(
            ColorSpace::new(&array(&[CIE_BASED_ABC]), &ctx).unwrap_err(),
            Error::RangeCheck
        );
        assert_eq!(
            ColorSpace::new(&array(&[PATTERN, PATTERN]), &ctx).unwrap_err(),
            Error::RangeCheck
        );
        assert_eq!(
            ColorSpace::new(&array(&[PATTERN, DEVICE_RGB, DEVICE_RGB]), &ctx).unwrap_err(),
            Error::RangeCheck
        );
    }

    #[test]
    fn pattern_spaces() {
        let ctx = Context::default();

        let colored = ColorSpace::new(&array(&[PATTERN]), &ctx).unwrap();
        assert!(colored.is_pattern());
        assert_eq!(colored.num_components(), 0);

        let uncolored = ColorSpace::new(&array(&[PATTERN, DEVICE_RGB]), &ctx).unwrap();
        assert_eq!(uncolored.num_components(), 3);
        rgb_close(uncolored.to_rgb(&[0.0, 1.0, 0.0], &ctx), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn colors_are_clamped() {
        let color = Color::new(ColorSpace::device_rgb(), &[1.5, -0.5, f32::NAN]);
        assert_eq!(color.components(), &[1.0, 0.0, 0.0]);

        let color = Color::new(ColorSpace::device_cmyk(), &[0.5]);
        assert_eq!(color.components(), &[0.5, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn current_color_queries() {
        let ctx = Context::default();

        let gray = Color::gray(0.5);
        assert_eq!(gray.current_gray(&ctx), 0.5);
        assert_eq!(gray.current_rgb(&ctx), [0.5, 0.5, 0.5]);
        assert_eq!(gray.current_cmyk(&ctx), [0.0, 0.0, 0.0, 0.5]);

        let cmyk = Color::cmyk([0.0, 0.0, 0.0, 1.0]);
        assert_eq!(cmyk.current_rgb(&ctx), [0.0, 0.0, 0.0]);
        assert_eq!(cmyk.current_gray(&ctx), 0.0);

        let red = Color::hsb([0.0, 1.0, 1.0]);
        rgb_close(red.current_rgb(&ctx), [1.0, 0.0, 0.0]);
        rgb_close(red.current_hsb(&ctx), [0.0, 1.0, 1.0]);
        assert_eq!(red.to_bgra8(&ctx), [0, 0, 255, 255]);
    }

    #[test]
    fn none_colors_are_transparent() {
        let ctx = Context::default();
        let cs = ColorSpace::new(
            &Object::array([
                Object::name(SEPARATION),
                Object::name(NONE),
                Object::name(DEVICE_GRAY),
                Object::procedure(b"{ }").unwrap(),
            ]),
            &ctx,
        )
        .unwrap();

        assert_eq!(Color::initial(cs).to_bgra8(&ctx)[3], 0);
    }

    #[test]
    fn tint_conversions_are_memoized() {
        let ctx = Context::default();
        let cs = ColorSpace::new(
            &Object::array([
                Object::name(SEPARATION),
                Object::name("Spot"),
                Object::name(DEVICE_GRAY),
                Object::procedure(b"{ 1 exch sub }").unwrap(),
            ]),
            &ctx,
        )
        .unwrap();

        let mut converter = ColorConverter::new(&cs);
        rgb_close(converter.to_rgb(&[0.25], &ctx), [0.75; 3]);
        rgb_close(converter.to_rgb(&[0.25], &ctx), [0.75; 3]);
        assert_eq!(converter.converted.len(), 1);

        let bulk = cs.convert_bulk(&[0.0, 1.0, 0.0], &ctx);
        assert_eq!(bulk.len(), 3);
        rgb_close(bulk[0], [1.0; 3]);
        rgb_close(bulk[1], [0.0; 3]);
    }

    #[test]
    fn device_cmyk_without_profile_uses_formula() {
        let ctx = Context::default();

        rgb_close(
            ColorSpace::device_cmyk().to_rgb(&[0.2, 0.0, 0.5, 0.1], &ctx),
            [0.7, 0.9, 0.4],
        );
        assert_eq!(
            ColorSpace::device_cmyk().convert_bulk(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0], &ctx),
            vec![[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]]
        );
    }
}
