//! Triangle meshes and patch meshes of shadings of types 4 to 7.

use crate::color::{ColorComponents, ColorSpace};
use crate::error::{Error, Result};
use crate::function::{DomainRange, Function, interpolate, pairs};
use crate::object::keys::{
    BITS_PER_COMPONENT, BITS_PER_COORDINATE, BITS_PER_FLAG, DATA_SOURCE, DECODE, VERTICES_PER_ROW,
};
use crate::object::{Dict, Object};
use kurbo::{CubicBez, ParamCurve, Point};
use log::warn;
use pscolor_common::bit::{BitReader, max_value};

/// The number of rows and columns a patch is split into when it's converted to triangles.
const PATCH_SUBDIVISIONS: usize = 16;

/// A vertex of a triangle mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshVertex {
    /// The position of the vertex.
    pub point: Point,
    /// The color of the vertex.
    pub color: ColorComponents,
}

/// A triangle made up of three vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshTriangle {
    /// The first vertex.
    pub p0: MeshVertex,
    /// The second vertex.
    pub p1: MeshVertex,
    /// The third vertex.
    pub p2: MeshVertex,
}

impl MeshTriangle {
    fn new([p0, p1, p2]: [MeshVertex; 3]) -> Self {
        Self { p0, p1, p2 }
    }
}

/// A patch of a patch mesh shading.
pub trait Patch {
    /// Map a point of the unit square into the patch.
    fn map_coordinate(&self, p: Point) -> Point;

    /// The colors at the corners of the unit square, in the order `(0, 0)`, `(0, 1)`,
    /// `(1, 1)`, `(1, 0)`.
    fn corner_colors(&self) -> &[ColorComponents; 4];

    /// The color at a point of the unit square, interpolated bilinearly between the corner
    /// colors.
    fn interpolate_color(&self, p: Point) -> ColorComponents {
        let [c00, c01, c11, c10] = self.corner_colors();
        let (u, v) = (p.x as f32, p.y as f32);

        c00.iter()
            .zip(c01.iter())
            .zip(c11.iter())
            .zip(c10.iter())
            .map(|(((c00, c01), c11), c10)| {
                (1.0 - u) * (1.0 - v) * c00 + (1.0 - u) * v * c01 + u * v * c11 + u * (1.0 - v) * c10
            })
            .collect()
    }

    /// Approximate the patch with triangles.
    fn to_triangles(&self, triangles: &mut Vec<MeshTriangle>) {
        const N: usize = PATCH_SUBDIVISIONS;

        let vertex = |i: usize, j: usize| {
            let p = Point::new(i as f64 / N as f64, j as f64 / N as f64);

            MeshVertex {
                point: self.map_coordinate(p),
                color: self.interpolate_color(p),
            }
        };

        let grid = (0..=N)
            .map(|j| (0..=N).map(|i| vertex(i, j)).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        push_lattice_triangles(&grid, triangles);
    }
}

/// A coons patch.
#[derive(Debug, Clone, PartialEq)]
pub struct CoonsPatch {
    /// The control points of the boundary curves, starting at the corner `(0, 0)` and
    /// going along the edge `u = 0` first.
    pub control_points: [Point; 12],
    /// The colors at the corners of the patch.
    pub colors: [ColorComponents; 4],
}

impl Patch for CoonsPatch {
    fn map_coordinate(&self, p: Point) -> Point {
        let cp = &self.control_points;
        let (u, v) = (p.x, p.y);

        let c1 = CubicBez::new(cp[0], cp[11], cp[10], cp[9]).eval(u);
        let c2 = CubicBez::new(cp[3], cp[4], cp[5], cp[6]).eval(u);
        let d1 = CubicBez::new(cp[0], cp[1], cp[2], cp[3]).eval(v);
        let d2 = CubicBez::new(cp[9], cp[8], cp[7], cp[6]).eval(v);

        let (p00, p03, p33, p30) = (cp[0].to_vec2(), cp[3].to_vec2(), cp[6].to_vec2(), cp[9].to_vec2());

        let sc = c1.to_vec2() * (1.0 - v) + c2.to_vec2() * v;
        let sd = d1.to_vec2() * (1.0 - u) + d2.to_vec2() * u;
        let sb = p00 * ((1.0 - v) * (1.0 - u))
            + p03 * (v * (1.0 - u))
            + p30 * ((1.0 - v) * u)
            + p33 * (v * u);

        (sc + sd - sb).to_point()
    }

    fn corner_colors(&self) -> &[ColorComponents; 4] {
        &self.colors
    }
}

/// A tensor-product patch.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorPatch {
    /// The control points. The first twelve points describe the boundary like for a
    /// [`CoonsPatch`], the last four are the interior points `p11`, `p12`, `p22` and `p21`.
    pub control_points: [Point; 16],
    /// The colors at the corners of the patch.
    pub colors: [ColorComponents; 4],
}

impl TensorPatch {
    /// The position `(i, j)` in the control point grid of each control point.
    const GRID: [(usize, usize); 16] = [
        (0, 0),
        (0, 1),
        (0, 2),
        (0, 3),
        (1, 3),
        (2, 3),
        (3, 3),
        (3, 2),
        (3, 1),
        (3, 0),
        (2, 0),
        (1, 0),
        (1, 1),
        (1, 2),
        (2, 2),
        (2, 1),
    ];
}

impl Patch for TensorPatch {
    fn map_coordinate(&self, p: Point) -> Point {
        let bernstein = |t: f64| {
            let s = 1.0 - t;

            [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
        };

        let bu = bernstein(p.x);
        let bv = bernstein(p.y);

        Self::GRID
            .iter()
            .zip(self.control_points)
            .fold(Point::ZERO, |acc, ((i, j), cp)| {
                acc + cp.to_vec2() * (bu[*i] * bv[*j])
            })
    }

    fn corner_colors(&self) -> &[ColorComponents; 4] {
        &self.colors
    }
}

/// The parsed data of a mesh shading.
#[derive(Debug, Clone)]
pub(crate) enum Mesh {
    Triangles(Vec<MeshTriangle>),
    Coons(Vec<CoonsPatch>),
    Tensor(Vec<TensorPatch>),
}

impl Mesh {
    /// Read the mesh of a shading dictionary of type 4 to 7.
    ///
    /// The mesh data is taken from the `DataSource` entry, or from the data of the shading
    /// itself if it's a stream.
    pub(crate) fn new(
        shading_type: u8,
        object: &Object,
        dict: &Dict,
        color_space: &ColorSpace,
        function: Option<&Function>,
    ) -> Result<Self> {
        let numbers;

        let source = match dict.get_object(DATA_SOURCE) {
            Some(Object::String(s)) => Source::Packed(BitReader::new(s)),
            Some(Object::Stream(s)) => Source::Packed(BitReader::new(s.data())),
            Some(Object::Array(items)) => {
                numbers = items
                    .iter()
                    .map(Object::as_f32)
                    .collect::<Option<Vec<_>>>()
                    .ok_or(Error::TypeCheck)?;

                Source::Numbers {
                    values: &numbers,
                    pos: 0,
                }
            }
            Some(_) => return Err(Error::TypeCheck),
            None => match object.as_stream() {
                Some(stream) => Source::Packed(BitReader::new(stream.data())),
                None => return Err(Error::Undefined),
            },
        };

        let mut reader = MeshReader::new(source, dict, color_space, function, shading_type != 5)?;

        let mesh = match shading_type {
            4 => Self::Triangles(read_free_form_triangles(&mut reader)),
            5 => {
                let vertices_per_row = match dict.get_object(VERTICES_PER_ROW) {
                    Some(v) => v.cast::<usize>().ok_or(Error::TypeCheck)?,
                    None => return Err(Error::Undefined),
                };

                if vertices_per_row < 2 {
                    return Err(Error::RangeCheck);
                }

                Self::Triangles(read_lattice_triangles(&mut reader, vertices_per_row))
            }
            6 => Self::Coons(
                read_patches::<12>(&mut reader, &COONS_EDGES)
                    .into_iter()
                    .map(|(control_points, colors)| CoonsPatch {
                        control_points,
                        colors,
                    })
                    .collect(),
            ),
            7 => Self::Tensor(
                read_patches::<16>(&mut reader, &TENSOR_EDGES)
                    .into_iter()
                    .map(|(control_points, colors)| TensorPatch {
                        control_points,
                        colors,
                    })
                    .collect(),
            ),
            _ => return Err(Error::RangeCheck),
        };

        Ok(mesh)
    }

    /// Call `f` for every color of the mesh.
    pub(crate) fn for_each_color(&mut self, mut f: impl FnMut(&mut ColorComponents)) {
        match self {
            Self::Triangles(triangles) => {
                for t in triangles {
                    f(&mut t.p0.color);
                    f(&mut t.p1.color);
                    f(&mut t.p2.color);
                }
            }
            Self::Coons(patches) => patches.iter_mut().flat_map(|p| &mut p.colors).for_each(f),
            Self::Tensor(patches) => patches.iter_mut().flat_map(|p| &mut p.colors).for_each(f),
        }
    }
}

enum Source<'a> {
    Packed(BitReader<'a>),
    Numbers { values: &'a [f32], pos: usize },
}

/// Reads vertices from packed mesh data or from an array of numbers.
///
/// Values from arrays are used as is, packed values are mapped through the `Decode` ranges.
struct MeshReader<'a> {
    source: Source<'a>,
    bits_per_coordinate: u8,
    bits_per_component: u8,
    bits_per_flag: u8,
    x: (f32, f32),
    y: (f32, f32),
    decode: DomainRange,
    function: Option<&'a Function>,
}

impl<'a> MeshReader<'a> {
    fn new(
        source: Source<'a>,
        dict: &Dict,
        color_space: &ColorSpace,
        function: Option<&'a Function>,
        has_flags: bool,
    ) -> Result<Self> {
        if function.is_some() && color_space.is_indexed() {
            return Err(Error::RangeCheck);
        }

        let color_values = if function.is_some() {
            1
        } else {
            color_space.num_components()
        };

        if let Source::Numbers { .. } = source {
            return Ok(Self {
                source,
                bits_per_coordinate: 0,
                bits_per_component: 0,
                bits_per_flag: 0,
                x: (0.0, 1.0),
                y: (0.0, 1.0),
                decode: (0..color_values).map(|_| (0.0, 1.0)).collect(),
                function,
            });
        }

        let bits = |key: &str, allowed: &[u8]| -> Result<u8> {
            let bits = match dict.get_object(key) {
                Some(b) => b.cast::<u8>().ok_or(Error::TypeCheck)?,
                None => return Err(Error::Undefined),
            };

            if allowed.contains(&bits) {
                Ok(bits)
            } else {
                Err(Error::RangeCheck)
            }
        };

        let bits_per_coordinate = bits(BITS_PER_COORDINATE, &[1, 2, 4, 8, 12, 16, 24, 32])?;
        let bits_per_component = bits(BITS_PER_COMPONENT, &[1, 2, 4, 8, 12, 16])?;
        let bits_per_flag = if has_flags {
            bits(BITS_PER_FLAG, &[2, 4, 8])?
        } else {
            0
        };

        let decode = match dict.get_object(DECODE) {
            Some(d) => pairs(&d.cast::<Vec<f32>>().ok_or(Error::TypeCheck)?)?,
            None => return Err(Error::Undefined),
        };

        if decode.len() < 2 + color_values {
            return Err(Error::RangeCheck);
        }

        Ok(Self {
            source,
            bits_per_coordinate,
            bits_per_component,
            bits_per_flag,
            x: decode[0],
            y: decode[1],
            decode: decode[2..2 + color_values].iter().copied().collect(),
            function,
        })
    }

    fn color_values(&self) -> usize {
        self.decode.len()
    }

    /// Whether the data contains a record with an (optional) flag, `points` coordinate pairs
    /// and `colors` colors.
    fn has_data(&self, flag: bool, points: usize, colors: usize) -> bool {
        match &self.source {
            Source::Packed(reader) => {
                let bits = if flag { self.bits_per_flag as usize } else { 0 }
                    + points * 2 * self.bits_per_coordinate as usize
                    + colors * self.color_values() * self.bits_per_component as usize;

                bits > 0 && reader.remaining_bits() >= bits
            }
            Source::Numbers { values, pos } => {
                let count = flag as usize + points * 2 + colors * self.color_values();

                count > 0 && pos + count <= values.len()
            }
        }
    }

    fn read_value(&mut self, bits: u8, range: (f32, f32)) -> f32 {
        match &mut self.source {
            Source::Packed(reader) => {
                let max = max_value(bits) as f32;

                interpolate(reader.read(bits) as f32, 0.0, max, range.0, range.1)
            }
            Source::Numbers { values, pos } => {
                let value = values.get(*pos).copied().unwrap_or(0.0);
                *pos += 1;

                value
            }
        }
    }

    fn read_flag(&mut self) -> u32 {
        match &mut self.source {
            // Only the two lowest bits of a flag are used.
            Source::Packed(reader) => reader.read(self.bits_per_flag) & 3,
            Source::Numbers { values, pos } => {
                let flag = values.get(*pos).copied().unwrap_or(0.0);
                *pos += 1;

                flag.max(0.0) as u32
            }
        }
    }

    fn read_point(&mut self) -> Point {
        let x = self.read_value(self.bits_per_coordinate, self.x);
        let y = self.read_value(self.bits_per_coordinate, self.y);

        Point::new(x as f64, y as f64)
    }

    /// Read a color. If the mesh has a function, a single parametric value is read and
    /// mapped through it.
    fn read_color(&mut self) -> ColorComponents {
        let values = (0..self.color_values())
            .map(|i| {
                let range = self.decode[i];

                self.read_value(self.bits_per_component, range)
            })
            .collect::<ColorComponents>();

        match self.function {
            Some(function) => function.eval(&values),
            None => values,
        }
    }

    fn read_vertex(&mut self) -> MeshVertex {
        let point = self.read_point();
        let color = self.read_color();
        self.align();

        MeshVertex { point, color }
    }

    fn align(&mut self) {
        if let Source::Packed(reader) = &mut self.source {
            reader.align();
        }
    }
}

fn read_free_form_triangles(reader: &mut MeshReader<'_>) -> Vec<MeshTriangle> {
    let mut triangles = vec![];
    let mut prev: Option<[MeshVertex; 3]> = None;

    while reader.has_data(true, 1, 1) {
        let flag = reader.read_flag();
        let vertex = reader.read_vertex();

        let triangle = match (flag, &prev) {
            (1, Some([_, b, c])) => [b.clone(), c.clone(), vertex],
            (2, Some([a, _, c])) => [a.clone(), c.clone(), vertex],
            _ => {
                if flag != 0 && prev.is_some() {
                    warn!("invalid edge flag {flag} in triangle mesh");
                }

                // Two more vertices complete a new triangle, their flags are ignored.
                let mut rest = [None, None];

                for r in &mut rest {
                    if !reader.has_data(true, 1, 1) {
                        break;
                    }

                    reader.read_flag();
                    *r = Some(reader.read_vertex());
                }

                let [Some(b), Some(c)] = rest else {
                    break;
                };

                [vertex, b, c]
            }
        };

        triangles.push(MeshTriangle::new(triangle.clone()));
        prev = Some(triangle);
    }

    triangles
}

fn read_lattice_triangles(
    reader: &mut MeshReader<'_>,
    vertices_per_row: usize,
) -> Vec<MeshTriangle> {
    let mut rows = vec![];

    while reader.has_data(false, vertices_per_row, vertices_per_row) {
        rows.push(
            (0..vertices_per_row)
                .map(|_| reader.read_vertex())
                .collect::<Vec<_>>(),
        );
    }

    let mut triangles = vec![];
    push_lattice_triangles(&rows, &mut triangles);

    triangles
}

/// Split each cell of a lattice of vertices into two triangles.
fn push_lattice_triangles(rows: &[Vec<MeshVertex>], triangles: &mut Vec<MeshTriangle>) {
    for pair in rows.windows(2) {
        let (top, bottom) = (&pair[0], &pair[1]);

        for j in 0..top.len().min(bottom.len()).saturating_sub(1) {
            let v00 = &top[j];
            let v10 = &top[j + 1];
            let v01 = &bottom[j];
            let v11 = &bottom[j + 1];

            triangles.push(MeshTriangle::new([v00.clone(), v10.clone(), v01.clone()]));
            triangles.push(MeshTriangle::new([v10.clone(), v11.clone(), v01.clone()]));
        }
    }
}

type PatchData<const N: usize> = ([Point; N], [ColorComponents; 4]);

/// The control points and colors a coons patch takes from the previous patch for the flags
/// 1, 2 and 3. The remaining nine points and two colors are read from the data.
const COONS_EDGES: [(&[usize], [usize; 2]); 3] = [
    (&[3, 4, 5], [1, 2]),
    (&[6, 7, 8], [2, 3]),
    (&[9, 10, 11], [3, 0]),
];

/// The control points and colors a tensor-product patch takes from the previous patch for
/// the flags 1, 2 and 3. This is the whole shared boundary, including both corners.
const TENSOR_EDGES: [(&[usize], [usize; 2]); 3] = [
    (&[3, 4, 5, 6], [1, 2]),
    (&[6, 7, 8, 9], [2, 3]),
    (&[9, 10, 11, 0], [3, 0]),
];

/// Read the patches of a coons (`N = 12`) or tensor-product (`N = 16`) patch mesh.
///
/// A patch with a non-zero flag shares the edge selected by the flag with the previous
/// patch: its first control points and first two colors are taken from there.
fn read_patches<const N: usize>(
    reader: &mut MeshReader<'_>,
    edges: &[(&[usize], [usize; 2]); 3],
) -> Vec<PatchData<N>> {
    let mut patches: Vec<PatchData<N>> = vec![];

    while reader.has_data(true, 0, 0) {
        let flag = reader.read_flag() as usize;

        let edge = match (flag, patches.last()) {
            (0, _) => None,
            (1..=3, Some(prev)) => Some((prev, edges[flag - 1])),
            _ => {
                warn!("invalid edge flag {flag} in patch mesh");

                None
            }
        };

        let mut points = [Point::ZERO; N];
        let mut colors: [ColorComponents; 4] = std::array::from_fn(|_| ColorComponents::new());

        let (first_point, first_color) = match edge {
            Some(((prev_points, prev_colors), (point_idx, color_idx))) => {
                for (p, i) in points.iter_mut().zip(point_idx) {
                    *p = prev_points[*i];
                }

                for (c, i) in colors.iter_mut().zip(color_idx) {
                    *c = prev_colors[i].clone();
                }

                (point_idx.len(), 2)
            }
            None => (0, 0),
        };

        if !reader.has_data(false, N - first_point, 4 - first_color) {
            break;
        }

        for p in &mut points[first_point..] {
            *p = reader.read_point();
        }

        for c in &mut colors[first_color..] {
            *c = reader.read_color();
        }

        reader.align();
        patches.push((points, colors));
    }

    patches
}
