//! `Separation` and `DeviceN` color spaces.

use crate::color::{ColorComponents, ColorSpace};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::function::{Function, Values};
use crate::object::keys::{ALL, NONE};
use crate::object::{Name, Object, TintTransform};
use crate::settings::ColorWarning;
use log::warn;
use pscolor_postscript::Procedure;
use std::sync::Arc;

/// A procedure that maps tint values to the components of an alternate space.
#[derive(Debug, Clone)]
pub(crate) enum TintSource {
    Procedure(Procedure),
    Function(Function),
    External(Arc<dyn TintTransform>),
}

impl TintSource {
    pub(crate) fn new(object: &Object) -> Result<Self> {
        match object {
            Object::Procedure(p) => Ok(Self::Procedure(p.clone())),
            Object::External(e) => Ok(Self::External(e.clone())),
            Object::Dict(_) | Object::Stream(_) | Object::Array(_) => {
                Ok(Self::Function(Function::new(object)?))
            }
            _ => Err(Error::TypeCheck),
        }
    }

    /// Run the procedure. Returns `None` if it failed.
    pub(crate) fn eval(&self, input: &[f32]) -> Option<Values> {
        match self {
            Self::Procedure(p) => p
                .eval(input)
                .inspect_err(|e| warn!("tint transform failed: {e}"))
                .ok(),
            Self::Function(f) => Some(f.eval(input)),
            Self::External(e) => e.eval(input),
        }
    }
}

/// Read a colorant name, which may be given as a name or a string.
fn colorant(object: &Object) -> Result<Name> {
    match object {
        Object::Name(n) => Ok(n.clone()),
        Object::String(s) => Ok(Name::new(&String::from_utf8_lossy(s))),
        _ => Err(Error::TypeCheck),
    }
}

/// Check that a space can be used as the alternate space of a `Separation` or `DeviceN`
/// space.
fn check_alternate(alternate: &ColorSpace) -> Result<()> {
    if alternate.is_pattern() || alternate.is_indexed() || alternate.is_special() {
        return Err(Error::RangeCheck);
    }

    Ok(())
}

/// Run a tint transform and fit the result to the alternate space.
pub(crate) fn tint_to_alternate(
    tint: &TintSource,
    alternate: &ColorSpace,
    input: &[f32],
    ctx: &Context,
) -> ColorComponents {
    let Some(mut out) = tint.eval(input) else {
        ctx.warn(ColorWarning::ProcedureFailed);

        return alternate.initial_color();
    };

    let n = alternate.num_components();

    if out.len() > n {
        // Only the topmost values are the results.
        out.drain(..out.len() - n);
    } else if out.len() < n {
        let initial = alternate.initial_color();
        out.extend_from_slice(&initial[out.len()..]);
    }

    alternate.clamp_components(&mut out);

    out
}

/// A `Separation` color space.
#[derive(Debug)]
pub(crate) struct Separation {
    colorant: Name,
    alternate: ColorSpace,
    tint: TintSource,
}

impl Separation {
    pub(crate) fn new(array: &[Object], ctx: &Context, depth: usize) -> Result<Self> {
        let [_, name, alternate, tint] = array else {
            return Err(Error::RangeCheck);
        };

        let colorant = colorant(name)?;
        let alternate = ColorSpace::new_inner(alternate, ctx, depth + 1)?;
        check_alternate(&alternate)?;
        let tint = TintSource::new(tint)?;

        Ok(Self {
            colorant,
            alternate,
            tint,
        })
    }

    pub(crate) fn colorant(&self) -> &Name {
        &self.colorant
    }

    pub(crate) fn alternate(&self) -> &ColorSpace {
        &self.alternate
    }

    /// A `None` separation doesn't produce any visible output.
    pub(crate) fn is_none(&self) -> bool {
        self.colorant.as_str() == NONE
    }

    /// Whether the separation paints on all separations, like registration marks.
    pub(crate) fn is_all(&self) -> bool {
        self.colorant.as_str() == ALL
    }

    pub(crate) fn to_alternate(&self, components: &[f32], ctx: &Context) -> ColorComponents {
        let tint = components.first().copied().unwrap_or(1.0);

        tint_to_alternate(&self.tint, &self.alternate, &[tint], ctx)
    }
}

/// A `DeviceN` color space.
#[derive(Debug)]
pub(crate) struct DeviceN {
    colorants: Vec<Name>,
    alternate: ColorSpace,
    tint: TintSource,
}

impl DeviceN {
    pub(crate) fn new(array: &[Object], ctx: &Context, depth: usize) -> Result<Self> {
        // An optional attributes dictionary may follow the tint transform.
        let (names, alternate, tint) = match array {
            [_, names, alternate, tint] | [_, names, alternate, tint, _] => {
                (names, alternate, tint)
            }
            _ => return Err(Error::RangeCheck),
        };

        let colorants = names
            .as_array()
            .ok_or(Error::TypeCheck)?
            .iter()
            .map(colorant)
            .collect::<Result<Vec<_>>>()?;

        if colorants.is_empty() || colorants.len() > super::MAX_COMPONENTS {
            return Err(Error::RangeCheck);
        }

        let alternate = ColorSpace::new_inner(alternate, ctx, depth + 1)?;
        check_alternate(&alternate)?;
        let tint = TintSource::new(tint)?;

        Ok(Self {
            colorants,
            alternate,
            tint,
        })
    }

    pub(crate) fn colorants(&self) -> &[Name] {
        &self.colorants
    }

    pub(crate) fn num_components(&self) -> usize {
        self.colorants.len()
    }

    pub(crate) fn alternate(&self) -> &ColorSpace {
        &self.alternate
    }

    /// A `DeviceN` space only consisting of `None` colorants doesn't produce any visible
    /// output.
    pub(crate) fn is_none(&self) -> bool {
        self.colorants.iter().all(|c| c.as_str() == NONE)
    }

    pub(crate) fn to_alternate(&self, components: &[f32], ctx: &Context) -> ColorComponents {
        tint_to_alternate(&self.tint, &self.alternate, components, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::tests::{collecting_context, rgb_close};
    use crate::object::keys::*;
    use crate::object::Dict;

    fn separation(name: &str, alternate: &str, tint: Object) -> Object {
        Object::array([
            Object::name(SEPARATION),
            Object::name(name),
            Object::name(alternate),
            tint,
        ])
    }

    #[test]
    fn procedure_tint_transform() {
        let ctx = Context::default();
        let cs = ColorSpace::new(
            &separation(
                "Spot",
                DEVICE_CMYK,
                Object::procedure(b"{ dup 0.5 mul exch 0 exch 0 exch }").unwrap(),
            ),
            &ctx,
        )
        .unwrap();

        assert_eq!(cs.num_components(), 1);
        assert_eq!(cs.initial_color().as_slice(), &[1.0]);
        // cmyk 0.5 0 0 1 is black.
        rgb_close(cs.to_rgb(&[1.0], &ctx), [0.0, 0.0, 0.0]);
        // cmyk 0.1 0 0 0.2
        rgb_close(cs.to_rgb(&[0.2], &ctx), [0.7, 0.8, 0.8]);
    }

    #[test]
    fn function_tint_transform() {
        let ctx = Context::default();
        let function = Dict::new()
            .with(FUNCTION_TYPE, 2)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
            .with(C0, Object::numbers(&[1.0]))
            .with(C1, Object::numbers(&[0.0]))
            .with(N, 1);
        let cs = ColorSpace::new(
            &separation("Spot", DEVICE_GRAY, Object::Dict(function)),
            &ctx,
        )
        .unwrap();

        rgb_close(cs.to_rgb(&[0.25], &ctx), [0.75; 3]);
    }

    #[test]
    fn failing_tint_transform_uses_initial_color() {
        let (ctx, warnings) = collecting_context();
        let cs = ColorSpace::new(
            &separation("Spot", DEVICE_RGB, Object::procedure(b"{ 0 div }").unwrap()),
            &ctx,
        )
        .unwrap();

        rgb_close(cs.to_rgb(&[0.5], &ctx), [0.0; 3]);
        assert_eq!(
            warnings.lock().unwrap().as_slice(),
            &[ColorWarning::ProcedureFailed]
        );
    }

    #[test]
    fn surplus_and_missing_outputs() {
        let ctx = Context::default();

        // Only the topmost value is used.
        let cs = ColorSpace::new(
            &separation("Spot", DEVICE_GRAY, Object::procedure(b"{ pop 0.1 0.9 }").unwrap()),
            &ctx,
        )
        .unwrap();
        rgb_close(cs.to_rgb(&[0.5], &ctx), [0.9; 3]);

        // Missing values are taken from the initial color.
        let cs = ColorSpace::new(
            &separation("Spot", DEVICE_CMYK, Object::procedure(b"{ pop 0 }").unwrap()),
            &ctx,
        )
        .unwrap();
        rgb_close(cs.to_rgb(&[0.5], &ctx), [0.0; 3]);
    }

    #[test]
    fn none_separation() {
        let ctx = Context::default();
        let cs = ColorSpace::new(
            &separation(NONE, DEVICE_GRAY, Object::procedure(b"{ }").unwrap()),
            &ctx,
        )
        .unwrap();

        assert!(cs.is_none());
    }

    #[test]
    fn device_n() {
        let ctx = Context::default();
        let cs = ColorSpace::new(
            &Object::array([
                Object::name(DEVICE_N),
                Object::array([Object::name("Cyan"), Object::name("Spot")]),
                Object::name(DEVICE_CMYK),
                Object::procedure(b"{ exch 0 0 4 -1 roll }").unwrap(),
            ]),
            &ctx,
        )
        .unwrap();

        assert_eq!(cs.num_components(), 2);
        assert_eq!(cs.initial_color().as_slice(), &[1.0, 1.0]);
        assert!(!cs.is_none());
        // cmyk 0.5 0 0 0.25
        rgb_close(cs.to_rgb(&[0.5, 0.25], &ctx), [0.25, 0.75, 0.75]);
    }

    #[test]
    fn device_n_attributes() {
        let ctx = Context::default();
        let device_n = |extra: &[Object]| {
            let mut items = vec![
                Object::name(DEVICE_N),
                Object::array([Object::name("Spot")]),
                Object::name(DEVICE_GRAY),
                Object::procedure(b"{ 1 exch sub }").unwrap(),
            ];
            items.extend_from_slice(extra);

            ColorSpace::new(&Object::array(items), &ctx)
        };

        // The attributes dictionary is ignored.
        let cs = device_n(&[Object::Dict(Dict::new())]).unwrap();
        rgb_close(cs.to_rgb(&[0.25], &ctx), [0.75; 3]);

        assert_eq!(
            device_n(&[Object::Dict(Dict::new()), Object::Null]).unwrap_err(),
            Error::RangeCheck
        );
    }

    #[test]
    fn invalid_alternate() {
        let ctx = Context::default();

        assert_eq!(
            ColorSpace::new(
                &separation("Spot", PATTERN, Object::procedure(b"{ }").unwrap()),
                &ctx
            )
            .unwrap_err(),
            Error::RangeCheck
        );
        assert_eq!(
            ColorSpace::new(&separation("Spot", DEVICE_GRAY, Object::Number(1.0)), &ctx)
                .unwrap_err(),
            Error::TypeCheck
        );
    }
}
