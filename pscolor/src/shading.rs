//! Shadings, prepared for a rendering backend.
//!
//! Axial and radial shadings are sampled into color stops, function-based shadings into a
//! raster and mesh shadings into triangles and patches. All colors are converted to RGB.

use crate::color::{Color, ColorSpace, f32_to_u8};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::function::{Function, lerp};
use crate::image::Pixmap;
use crate::mesh::{CoonsPatch, Mesh, MeshTriangle, TensorPatch};
use crate::object::keys::{
    ANTI_ALIAS, BACKGROUND, BBOX, COLOR_SPACE, COORDS, DOMAIN, EXTEND, FUNCTION, MATRIX,
    SHADING_TYPE,
};
use crate::object::{Dict, FromObject, Object};
use crate::settings::ColorWarning;
use kurbo::{Affine, Rect};
use smallvec::SmallVec;

/// A color stop of an axial or radial shading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    /// The position of the stop, between 0 and 1.
    pub offset: f32,
    /// The RGB color of the stop.
    pub color: [f32; 3],
}

/// A type of shading.
#[derive(Debug, Clone)]
pub enum ShadingType {
    /// A function-based shading.
    FunctionBased {
        /// The function sampled at the center of each pixel of a raster covering the domain.
        raster: Pixmap,
        /// The transform from raster pixels into the coordinate space of the shading.
        transform: Affine,
    },
    /// An axial shading.
    Axial {
        /// The start and end point, as `x0 y0 x1 y1`.
        coords: [f32; 4],
        /// Whether the shading extends beyond the start and end point.
        extend: [bool; 2],
        /// The color stops.
        stops: Vec<ColorStop>,
    },
    /// A radial shading.
    Radial {
        /// The start and end circle, as `x0 y0 r0 x1 y1 r1`.
        coords: [f32; 6],
        /// Whether the shading extends beyond the start and end circle.
        extend: [bool; 2],
        /// The color stops.
        stops: Vec<ColorStop>,
    },
    /// A free-form or lattice-form triangle mesh. Vertex colors are RGB.
    TriangleMesh {
        /// The triangles of the mesh.
        triangles: Vec<MeshTriangle>,
    },
    /// A coons patch mesh. Corner colors are RGB.
    CoonsPatchMesh {
        /// The patches of the mesh.
        patches: Vec<CoonsPatch>,
    },
    /// A tensor-product patch mesh. Corner colors are RGB.
    TensorProductPatchMesh {
        /// The patches of the mesh.
        patches: Vec<TensorPatch>,
    },
}

/// A shading.
#[derive(Debug, Clone)]
pub struct Shading {
    /// The type of shading.
    pub shading_type: ShadingType,
    /// The color space of the shading.
    pub color_space: ColorSpace,
    /// The bounding box of the shading.
    pub bbox: Option<Rect>,
    /// The RGB background color of the shading.
    pub background: Option<[f32; 3]>,
    /// Whether the shading should be anti-aliased.
    pub anti_alias: bool,
}

impl Shading {
    /// Create a new shading from a shading dictionary, or a stream for mesh shadings.
    pub fn new(object: &Object, ctx: &Context) -> Result<Self> {
        let dict = object.as_dict().ok_or(Error::TypeCheck)?;

        let shading_num = required::<u8>(dict, SHADING_TYPE)?;

        if !(1..=7).contains(&shading_num) {
            return Err(Error::RangeCheck);
        }

        let color_space = ColorSpace::new(
            dict.get_object(COLOR_SPACE).ok_or(Error::Undefined)?,
            ctx,
        )?;

        if color_space.is_pattern() {
            return Err(Error::RangeCheck);
        }

        let function = match dict.get_object(FUNCTION) {
            Some(f) => {
                let function = Function::new(f)?;

                if !function.is_supported() {
                    ctx.warn(ColorWarning::UnsupportedFunctionType);
                }

                Some(function)
            }
            None => None,
        };

        let shading_type = match shading_num {
            1 => {
                let function = function.ok_or(Error::Undefined)?;
                let domain = optional::<[f32; 4]>(dict, DOMAIN)?.unwrap_or([0.0, 1.0, 0.0, 1.0]);
                let matrix = optional::<[f32; 6]>(dict, MATRIX)?
                    .map(|m| Affine::new(m.map(f64::from)))
                    .unwrap_or_default();

                let (raster, pixel_to_domain) =
                    sample_function(&function, domain, &color_space, ctx);

                ShadingType::FunctionBased {
                    raster,
                    transform: matrix * pixel_to_domain,
                }
            }
            2 | 3 => {
                let function = function.ok_or(Error::Undefined)?;
                let domain = optional::<[f32; 2]>(dict, DOMAIN)?.unwrap_or([0.0, 1.0]);
                let extend = optional::<[bool; 2]>(dict, EXTEND)?.unwrap_or([false, false]);
                let stops = color_stops(&function, domain, &color_space, ctx);

                if shading_num == 2 {
                    ShadingType::Axial {
                        coords: required(dict, COORDS)?,
                        extend,
                        stops,
                    }
                } else {
                    let coords = required::<[f32; 6]>(dict, COORDS)?;

                    if coords[2] < 0.0 || coords[5] < 0.0 {
                        return Err(Error::RangeCheck);
                    }

                    ShadingType::Radial {
                        coords,
                        extend,
                        stops,
                    }
                }
            }
            _ => {
                let mut mesh =
                    Mesh::new(shading_num, object, dict, &color_space, function.as_ref())?;
                resolve_mesh_colors(&mut mesh, &color_space, ctx);

                match mesh {
                    Mesh::Triangles(triangles) => ShadingType::TriangleMesh { triangles },
                    Mesh::Coons(patches) => ShadingType::CoonsPatchMesh { patches },
                    Mesh::Tensor(patches) => ShadingType::TensorProductPatchMesh { patches },
                }
            }
        };

        let bbox = optional::<[f32; 4]>(dict, BBOX)?.map(|b| {
            Rect::new(b[0] as f64, b[1] as f64, b[2] as f64, b[3] as f64).abs()
        });

        let background = match optional::<Vec<f32>>(dict, BACKGROUND)? {
            Some(b) if b.len() == color_space.num_components() => {
                Some(Color::new(color_space.clone(), &b).to_rgb(ctx))
            }
            Some(_) => return Err(Error::RangeCheck),
            None => None,
        };

        let anti_alias = optional::<bool>(dict, ANTI_ALIAS)?.unwrap_or(false);

        Ok(Self {
            shading_type,
            color_space,
            bbox,
            background,
            anti_alias,
        })
    }
}

fn optional<T: FromObject>(dict: &Dict, key: &str) -> Result<Option<T>> {
    match dict.get_object(key) {
        Some(o) => o.cast::<T>().map(Some).ok_or(Error::TypeCheck),
        None => Ok(None),
    }
}

fn required<T: FromObject>(dict: &Dict, key: &str) -> Result<T> {
    optional(dict, key)?.ok_or(Error::Undefined)
}

/// Evaluate a function and fit its outputs to the components of the color space.
fn eval_components(function: &Function, input: &[f32], n: usize, out: &mut Vec<f32>) {
    let mut values = function.eval(input);
    values.resize(n, 0.0);

    out.extend_from_slice(&values);
}

fn color_stops(
    function: &Function,
    [t0, t1]: [f32; 2],
    color_space: &ColorSpace,
    ctx: &Context,
) -> Vec<ColorStop> {
    let steps = ctx.settings.gradient_steps.max(1);
    let n = color_space.num_components();

    let offsets = (0..=steps)
        .map(|i| i as f32 / steps as f32)
        .collect::<Vec<_>>();

    let mut components = Vec::with_capacity(offsets.len() * n);

    for offset in &offsets {
        eval_components(function, &[lerp(*offset, t0, t1)], n, &mut components);
    }

    offsets
        .into_iter()
        .zip(color_space.convert_bulk(&components, ctx))
        .map(|(offset, color)| ColorStop { offset, color })
        .collect()
}

/// Sample a function-based shading into a raster. Returns the raster and the transform from
/// raster pixels into the domain of the function.
fn sample_function(
    function: &Function,
    [x0, x1, y0, y1]: [f32; 4],
    color_space: &ColorSpace,
    ctx: &Context,
) -> (Pixmap, Affine) {
    let size = ctx.settings.function_raster_size.max(1);
    let n = color_space.num_components();
    let cells = size as usize * size as usize;

    let mut components = Vec::with_capacity(cells * n);

    for row in 0..size {
        let y = lerp((row as f32 + 0.5) / size as f32, y0, y1);

        for col in 0..size {
            let x = lerp((col as f32 + 0.5) / size as f32, x0, x1);

            eval_components(function, &[x, y], n, &mut components);
        }
    }

    let alpha = if color_space.is_none() { 0 } else { 255 };
    let data = color_space
        .convert_bulk(&components, ctx)
        .into_iter()
        .flat_map(|[r, g, b]| [f32_to_u8(b), f32_to_u8(g), f32_to_u8(r), alpha])
        .collect();

    let raster = Pixmap::from_data(size as u32, size as u32, data);
    let pixel_to_domain = Affine::new([
        (x1 - x0) as f64 / size as f64,
        0.0,
        0.0,
        (y1 - y0) as f64 / size as f64,
        x0 as f64,
        y0 as f64,
    ]);

    (raster, pixel_to_domain)
}

fn resolve_mesh_colors(mesh: &mut Mesh, color_space: &ColorSpace, ctx: &Context) {
    let n = color_space.num_components();
    let mut components = vec![];

    mesh.for_each_color(|c| {
        c.resize(n, 0.0);
        components.extend_from_slice(c);
    });

    let mut rgb = color_space.convert_bulk(&components, ctx).into_iter();

    mesh.for_each_color(|c| {
        let color = rgb.next().unwrap_or([0.0; 3]);
        *c = SmallVec::from_slice(&color);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::tests::{collecting_context, rgb_close};
    use crate::function::tests::identity;
    use crate::mesh::Patch;
    use crate::object::keys::*;
    use crate::settings::ColorSettings;
    use kurbo::Point;

    fn axial(color_space: &str, function: Object) -> Dict {
        Dict::new()
            .with(SHADING_TYPE, 2)
            .with(COLOR_SPACE, Object::name(color_space))
            .with(COORDS, Object::numbers(&[0.0, 0.0, 100.0, 0.0]))
            .with(FUNCTION, function)
    }

    #[test]
    fn axial_color_stops() {
        let ctx = Context::default();
        let dict = axial(DEVICE_GRAY, identity())
            .with(EXTEND, Object::array([Object::Bool(true), Object::Bool(false)]));
        let shading = Shading::new(&Object::Dict(dict), &ctx).unwrap();

        let ShadingType::Axial {
            coords,
            extend,
            stops,
        } = shading.shading_type
        else {
            panic!("expected an axial shading");
        };

        assert_eq!(coords, [0.0, 0.0, 100.0, 0.0]);
        assert_eq!(extend, [true, false]);
        assert_eq!(stops.len(), 65);
        assert_eq!(stops[0], ColorStop { offset: 0.0, color: [0.0; 3] });
        assert_eq!(stops[64], ColorStop { offset: 1.0, color: [1.0; 3] });
        rgb_close(stops[32].color, [0.5; 3]);
    }

    #[test]
    fn radial_shading_with_domain() {
        let ctx = Context::default();
        let dict = axial(DEVICE_GRAY, identity())
            .with(SHADING_TYPE, 3)
            .with(COORDS, Object::numbers(&[0.0, 0.0, 0.0, 0.0, 0.0, 10.0]))
            .with(DOMAIN, Object::numbers(&[0.5, 1.0]));
        let shading = Shading::new(&Object::Dict(dict), &ctx).unwrap();

        let ShadingType::Radial { stops, .. } = shading.shading_type else {
            panic!("expected a radial shading");
        };

        rgb_close(stops[0].color, [0.5; 3]);
        rgb_close(stops[64].color, [1.0; 3]);
    }

    #[test]
    fn function_based_raster() {
        let settings = ColorSettings {
            function_raster_size: 2,
            ..ColorSettings::default()
        };
        let ctx = Context::new(settings);
        let function = Dict::new()
            .with(FUNCTION_TYPE, 4)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0, 0.0, 1.0]))
            .with(RANGE, Object::numbers(&[0.0, 1.0]))
            .with(DATA_SOURCE, Object::procedure(b"{ pop }").unwrap());
        let dict = Dict::new()
            .with(SHADING_TYPE, 1)
            .with(COLOR_SPACE, Object::name(DEVICE_GRAY))
            .with(MATRIX, Object::numbers(&[2.0, 0.0, 0.0, 2.0, 10.0, 10.0]))
            .with(FUNCTION, function);
        let shading = Shading::new(&Object::Dict(dict), &ctx).unwrap();

        let ShadingType::FunctionBased { raster, transform } = shading.shading_type else {
            panic!("expected a function-based shading");
        };

        // The function is sampled at x = 0.25 and x = 0.75.
        assert_eq!(raster.pixel(0, 0), Some([64, 64, 64, 255]));
        assert_eq!(raster.pixel(1, 1), Some([191, 191, 191, 255]));
        // Pixel (2, 2) is the corner (1, 1) of the domain.
        assert_eq!(transform * Point::new(2.0, 2.0), Point::new(12.0, 12.0));
    }

    #[test]
    fn separation_stops_use_tint_transform() {
        let ctx = Context::default();
        let color_space = Object::array([
            Object::name(SEPARATION),
            Object::name("Spot"),
            Object::name(DEVICE_RGB),
            Object::procedure(b"{ dup 0 exch }").unwrap(),
        ]);
        let dict = axial(DEVICE_GRAY, identity()).with(COLOR_SPACE, color_space);
        let shading = Shading::new(&Object::Dict(dict), &ctx).unwrap();

        let ShadingType::Axial { stops, .. } = shading.shading_type else {
            panic!("expected an axial shading");
        };

        rgb_close(stops[64].color, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn mesh_colors_are_rgb() {
        let ctx = Context::default();
        let data = [
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, //
        ];
        let dict = Dict::new()
            .with(SHADING_TYPE, 4)
            .with(COLOR_SPACE, Object::name(DEVICE_CMYK))
            .with(DATA_SOURCE, Object::numbers(&data))
            .with(BACKGROUND, Object::numbers(&[0.0, 0.0, 0.0, 0.0]));
        let shading = Shading::new(&Object::Dict(dict), &ctx).unwrap();

        assert_eq!(shading.background, Some([1.0; 3]));

        let ShadingType::TriangleMesh { triangles } = shading.shading_type else {
            panic!("expected a triangle mesh");
        };

        assert_eq!(triangles[0].p0.color.as_slice(), &[0.0, 0.0, 0.0]);
        assert_eq!(triangles[0].p1.color.as_slice(), &[1.0, 1.0, 1.0]);
        assert_eq!(triangles[0].p2.color.as_slice(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn patch_mesh() {
        let ctx = Context::default();
        let mut data = vec![0.0];
        data.extend((0..24).map(|i| i as f32));
        data.extend([0.0, 0.0, 1.0, 1.0]);

        let dict = Dict::new()
            .with(SHADING_TYPE, 6)
            .with(COLOR_SPACE, Object::name(DEVICE_GRAY))
            .with(DATA_SOURCE, Object::numbers(&data));
        let shading = Shading::new(&Object::Dict(dict), &ctx).unwrap();

        let ShadingType::CoonsPatchMesh { patches } = shading.shading_type else {
            panic!("expected a coons patch mesh");
        };

        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].colors[2].as_slice(), &[1.0, 1.0, 1.0]);

        let mut triangles = vec![];
        patches[0].to_triangles(&mut triangles);
        assert!(!triangles.is_empty());
    }

    #[test]
    fn unsupported_function_warns() {
        let (ctx, warnings) = collecting_context();
        let function = Dict::new()
            .with(FUNCTION_TYPE, 7)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]));
        let shading = Shading::new(&Object::Dict(axial(DEVICE_GRAY, Object::Dict(function))), &ctx);

        assert!(shading.is_ok());
        assert_eq!(
            warnings.lock().unwrap().as_slice(),
            &[ColorWarning::UnsupportedFunctionType]
        );
    }

    #[test]
    fn invalid_shadings() {
        let ctx = Context::default();
        let check = |dict: Dict, err: Error| {
            assert_eq!(Shading::new(&Object::Dict(dict), &ctx).unwrap_err(), err);
        };

        check(axial(DEVICE_GRAY, identity()).with(SHADING_TYPE, 8), Error::RangeCheck);
        check(axial(PATTERN, identity()), Error::RangeCheck);
        check(
            axial(DEVICE_GRAY, identity()).with(COORDS, Object::numbers(&[0.0])),
            Error::TypeCheck,
        );
        check(
            axial(DEVICE_GRAY, identity()).with(BACKGROUND, Object::numbers(&[0.0, 0.0])),
            Error::RangeCheck,
        );
        check(
            Dict::new()
                .with(SHADING_TYPE, 2)
                .with(COLOR_SPACE, Object::name(DEVICE_GRAY)),
            Error::Undefined,
        );
        assert_eq!(
            Shading::new(&Object::Number(1.0), &ctx).unwrap_err(),
            Error::TypeCheck
        );
    }
}
