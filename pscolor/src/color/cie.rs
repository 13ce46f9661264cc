//! CIE-based color spaces.
//!
//! All four families share the same pipeline. `DEF` and `DEFG` spaces first map their
//! components through a lookup table into `ABC` components, which are then decoded and
//! transformed into `LMN` components and finally into CIE XYZ. XYZ is converted into sRGB
//! with a fixed matrix and no white point adaptation.

use crate::color::ColorComponents;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::function::{DomainRange, interpolate, lerp, read_pairs};
use crate::object::keys::*;
use crate::object::{Dict, Object};
use pscolor_postscript::Procedure;
use smallvec::{SmallVec, smallvec};
use std::sync::OnceLock;

/// The maximum number of entries of a `DEF` or `DEFG` lookup table.
const MAX_TABLE_ENTRIES: usize = 1 << 24;

const IDENTITY: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CieFamily {
    A,
    Abc,
    Def,
    Defg,
}

type Procedures = SmallVec<[Option<Procedure>; 4]>;

/// A `CIEBasedA`, `CIEBasedABC`, `CIEBasedDEF` or `CIEBasedDEFG` color space.
#[derive(Debug)]
pub(crate) struct CieBased {
    family: CieFamily,
    range_abc: DomainRange,
    decode_abc: Procedures,
    matrix_abc: [f32; 9],
    range_lmn: DomainRange,
    decode_lmn: Procedures,
    matrix_lmn: [f32; 9],
    table: Option<LookupTable>,
    /// The lookup table converted to sRGB, built on first use by the image converter.
    ///
    /// The conversion only reads this space and content-keyed decode tables, so the table
    /// is the same for every context.
    rgb_table: OnceLock<Vec<[f32; 3]>>,
}

impl CieBased {
    pub(crate) fn new(family: CieFamily, dict: &Dict) -> Result<Self> {
        let (range_abc, decode_abc, matrix_abc) = if family == CieFamily::A {
            let range = read_range(dict, RANGE_A, 1)?;
            let decode = match dict.get_object(DECODE_A) {
                Some(Object::Procedure(p)) => smallvec![Some(p.clone())],
                Some(_) => return Err(Error::TypeCheck),
                None => smallvec![None],
            };
            let matrix = match dict.get_object(MATRIX_A) {
                Some(m) => {
                    let [a, b, c] = m.cast::<[f32; 3]>().ok_or(Error::RangeCheck)?;

                    [a, b, c, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
                }
                None => [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            };

            (range, decode, matrix)
        } else {
            (
                read_range(dict, RANGE_ABC, 3)?,
                read_procedures(dict, DECODE_ABC, 3)?,
                read_matrix(dict, MATRIX_ABC)?,
            )
        };

        let range_lmn = read_range(dict, RANGE_LMN, 3)?;
        let decode_lmn = read_procedures(dict, DECODE_LMN, 3)?;
        let matrix_lmn = read_matrix(dict, MATRIX_LMN)?;

        // The white and black points are validated, but not used for the conversion.
        let white_point = match dict.get_object(WHITE_POINT) {
            Some(w) => w.cast::<[f32; 3]>().ok_or(Error::RangeCheck)?,
            None => return Err(Error::Undefined),
        };

        if white_point.iter().any(|v| !v.is_finite() || *v < 0.0) || white_point[1] <= 0.0 {
            return Err(Error::RangeCheck);
        }

        if let Some(black_point) = dict.get_object(BLACK_POINT) {
            black_point.cast::<[f32; 3]>().ok_or(Error::RangeCheck)?;
        }

        let table = match family {
            CieFamily::Def | CieFamily::Defg => Some(LookupTable::new(family, dict)?),
            _ => None,
        };

        Ok(Self {
            family,
            range_abc,
            decode_abc,
            matrix_abc,
            range_lmn,
            decode_lmn,
            matrix_lmn,
            table,
            rgb_table: OnceLock::new(),
        })
    }

    pub(crate) fn family(&self) -> CieFamily {
        self.family
    }

    pub(crate) fn num_components(&self) -> usize {
        match &self.table {
            Some(table) => table.dims.len(),
            None => self.range_abc.len(),
        }
    }

    /// The ranges of the components of the space.
    pub(crate) fn ranges(&self) -> &DomainRange {
        match &self.table {
            Some(table) => &table.range,
            None => &self.range_abc,
        }
    }

    /// Whether the space maps its components unchanged to XYZ, so they can be used as
    /// gray or RGB values directly.
    pub(crate) fn is_identity(&self) -> bool {
        let unit = |r: &DomainRange| r.iter().all(|r| *r == (0.0, 1.0));
        let no_procs = |p: &Procedures| p.iter().all(Option::is_none);

        let matrix_abc = match self.family {
            CieFamily::A => [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            CieFamily::Abc => IDENTITY,
            _ => return false,
        };

        self.matrix_abc == matrix_abc
            && self.matrix_lmn == IDENTITY
            && unit(&self.range_abc)
            && unit(&self.range_lmn)
            && no_procs(&self.decode_abc)
            && no_procs(&self.decode_lmn)
    }

    pub(crate) fn to_rgb(&self, components: &[f32], ctx: &Context) -> [f32; 3] {
        match &self.table {
            Some(table) => {
                let grid = table.grid_position(components, ctx);
                let abc = table.sample(&grid, self.family == CieFamily::Defg, |i| {
                    table.entry(i)
                });

                self.abc_to_rgb(&self.scale_table_entry(abc), ctx)
            }
            None => self.abc_to_rgb(components, ctx),
        }
    }

    /// Convert many colors, `num_components` per color.
    pub(crate) fn convert_bulk(&self, input: &[f32], ctx: &Context) -> Vec<[f32; 3]> {
        let n = self.num_components();

        if self.is_identity() {
            return input
                .chunks_exact(n)
                .map(|c| match c {
                    [a] => [a.clamp(0.0, 1.0); 3],
                    _ => [c[0].clamp(0.0, 1.0), c[1].clamp(0.0, 1.0), c[2].clamp(0.0, 1.0)],
                })
                .collect();
        }

        if let Some(table) = &self.table {
            let rgb_table = self.rgb_table.get_or_init(|| {
                (0..table.len())
                    .map(|i| self.abc_to_rgb(&self.scale_table_entry(table.entry(i)), ctx))
                    .collect()
            });

            return input
                .chunks_exact(n)
                .map(|c| {
                    let grid = table.grid_position(c, ctx);

                    table.sample(&grid, self.family == CieFamily::Defg, |i| {
                        rgb_table.get(i).copied().unwrap_or([0.0; 3])
                    })
                })
                .collect();
        }

        input
            .chunks_exact(n)
            .map(|c| self.abc_to_rgb(c, ctx))
            .collect()
    }

    /// Map a table entry from `[0, 1]` into `RangeABC`.
    fn scale_table_entry(&self, entry: [f32; 3]) -> [f32; 3] {
        let mut abc = entry;

        for (v, (min, max)) in abc.iter_mut().zip(self.range_abc.iter()) {
            *v = lerp(*v, *min, *max);
        }

        abc
    }

    fn abc_to_rgb(&self, abc: &[f32], ctx: &Context) -> [f32; 3] {
        xyz_to_srgb(self.abc_to_xyz(abc, ctx))
    }

    fn abc_to_xyz(&self, abc: &[f32], ctx: &Context) -> [f32; 3] {
        let mut decoded = [0.0; 3];

        for (i, (d, (range, procedure))) in decoded
            .iter_mut()
            .zip(self.range_abc.iter().zip(self.decode_abc.iter()))
            .enumerate()
        {
            let v = clamp_to(abc.get(i).copied().unwrap_or(range.0), *range);
            *d = decode(procedure, v, ctx);
        }

        let mut lmn = mul(&self.matrix_abc, decoded);

        for (v, (range, procedure)) in lmn
            .iter_mut()
            .zip(self.range_lmn.iter().zip(self.decode_lmn.iter()))
        {
            *v = decode(procedure, clamp_to(*v, *range), ctx);
        }

        mul(&self.matrix_lmn, lmn)
    }
}

/// The lookup table of a `DEF` or `DEFG` space.
#[derive(Debug)]
struct LookupTable {
    range: DomainRange,
    decode: Procedures,
    range_hijk: DomainRange,
    dims: SmallVec<[usize; 4]>,
    /// Three bytes per entry, the first dimension varying slowest.
    data: Vec<u8>,
}

impl LookupTable {
    fn new(family: CieFamily, dict: &Dict) -> Result<Self> {
        let (n, range_key, decode_key, hijk_key) = if family == CieFamily::Def {
            (3, RANGE_DEF, DECODE_DEF, RANGE_HIJ)
        } else {
            (4, RANGE_DEFG, DECODE_DEFG, RANGE_HIJK)
        };

        let range = read_range(dict, range_key, n)?;
        let decode = read_procedures(dict, decode_key, n)?;
        let range_hijk = read_range(dict, hijk_key, n)?;

        let table = dict
            .get_object(TABLE)
            .ok_or(Error::Undefined)?
            .as_array()
            .ok_or(Error::TypeCheck)?;

        if table.len() != n + 1 {
            return Err(Error::RangeCheck);
        }

        let dims = table[..n]
            .iter()
            .map(|d| match d.cast::<usize>() {
                Some(0) => Err(Error::RangeCheck),
                Some(d) => Ok(d),
                None => Err(Error::TypeCheck),
            })
            .collect::<Result<SmallVec<[usize; 4]>>>()?;

        let entries = dims
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(*d))
            .filter(|e| *e <= MAX_TABLE_ENTRIES)
            .ok_or(Error::LimitCheck)?;

        // `DEF` tables hold one string per first index, `DEFG` tables one array of strings
        // per first index. A flat array of strings is accepted for both.
        let strings = collect_strings(&table[n])?;
        let (string_count, string_len) = if family == CieFamily::Def {
            (dims[0], 3 * dims[1] * dims[2])
        } else {
            (dims[0] * dims[1], 3 * dims[2] * dims[3])
        };

        if strings.len() != string_count || strings.iter().any(|s| s.len() < string_len) {
            return Err(Error::RangeCheck);
        }

        let mut data = Vec::with_capacity(entries * 3);

        for s in &strings {
            data.extend_from_slice(&s[..string_len]);
        }

        Ok(Self {
            range,
            decode,
            range_hijk,
            dims,
            data,
        })
    }

    fn len(&self) -> usize {
        self.data.len() / 3
    }

    fn entry(&self, index: usize) -> [f32; 3] {
        match self.data.get(index * 3..index * 3 + 3) {
            Some([a, b, c]) => [*a as f32 / 255.0, *b as f32 / 255.0, *c as f32 / 255.0],
            _ => [0.0; 3],
        }
    }

    /// Decode the components and map them to (fractional) positions in the table.
    fn grid_position(&self, components: &[f32], ctx: &Context) -> ColorComponents {
        self.range
            .iter()
            .zip(self.decode.iter())
            .zip(self.range_hijk.iter().zip(self.dims.iter()))
            .enumerate()
            .map(|(i, ((range, procedure), (hijk, dim)))| {
                let v = clamp_to(components.get(i).copied().unwrap_or(range.0), *range);
                let v = clamp_to(decode(procedure, v, ctx), *hijk);
                let last = (*dim - 1) as f32;

                interpolate(v, hijk.0, hijk.1, 0.0, last).clamp(0.0, last)
            })
            .collect()
    }

    /// Sample the table at a grid position, either multilinearly or at the nearest entry.
    fn sample(&self, grid: &[f32], nearest: bool, fetch: impl Fn(usize) -> [f32; 3]) -> [f32; 3] {
        let mut strides: SmallVec<[usize; 4]> = smallvec![1; self.dims.len()];

        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }

        if nearest {
            let index = grid
                .iter()
                .zip(strides.iter())
                .map(|(g, s)| (g + 0.5) as usize * s)
                .sum();

            return fetch(index);
        }

        let mut out = [0.0; 3];

        for corner in 0..(1usize << grid.len()) {
            let mut weight = 1.0;
            let mut index = 0;

            for (dim, ((g, stride), size)) in grid
                .iter()
                .zip(strides.iter())
                .zip(self.dims.iter())
                .enumerate()
            {
                let lo = g.floor();
                let frac = g - lo;
                let lo = lo as usize;

                let (idx, w) = if corner & (1 << dim) != 0 {
                    ((lo + 1).min(size - 1), frac)
                } else {
                    (lo, 1.0 - frac)
                };

                weight *= w;
                index += idx * stride;
            }

            if weight == 0.0 {
                continue;
            }

            let value = fetch(index);

            for (o, v) in out.iter_mut().zip(value) {
                *o += weight * v;
            }
        }

        out
    }
}

fn collect_strings(object: &Object) -> Result<Vec<&[u8]>> {
    let mut strings = vec![];

    for item in object.as_array().ok_or(Error::TypeCheck)? {
        match item {
            Object::String(s) => strings.push(s.as_ref()),
            Object::Array(a) => {
                for inner in a.iter() {
                    match inner {
                        Object::String(s) => strings.push(s.as_ref()),
                        _ => return Err(Error::TypeCheck),
                    }
                }
            }
            _ => return Err(Error::TypeCheck),
        }
    }

    Ok(strings)
}

fn read_range(dict: &Dict, key: &str, n: usize) -> Result<DomainRange> {
    let range = read_pairs(dict, key)?.unwrap_or_else(|| smallvec![(0.0, 1.0); n]);

    if range.len() != n {
        return Err(Error::RangeCheck);
    }

    Ok(range)
}

fn read_matrix(dict: &Dict, key: &str) -> Result<[f32; 9]> {
    let Some(matrix) = dict.get_object(key) else {
        return Ok(IDENTITY);
    };

    let values = matrix.cast::<Vec<f32>>().ok_or(Error::TypeCheck)?;

    values.try_into().map_err(|_| Error::RangeCheck)
}

fn read_procedures(dict: &Dict, key: &str, n: usize) -> Result<Procedures> {
    let Some(procedures) = dict.get_object(key) else {
        return Ok(smallvec![None; n]);
    };

    let procedures = procedures.as_array().ok_or(Error::TypeCheck)?;

    if procedures.len() != n {
        return Err(Error::RangeCheck);
    }

    procedures
        .iter()
        .map(|p| match p {
            Object::Procedure(p) => Ok(Some(p.clone())),
            _ => Err(Error::TypeCheck),
        })
        .collect()
}

#[inline]
fn clamp_to(v: f32, (min, max): (f32, f32)) -> f32 {
    if v.is_nan() { min } else { v.clamp(min, max) }
}

#[inline]
fn decode(procedure: &Option<Procedure>, v: f32, ctx: &Context) -> f32 {
    match procedure {
        Some(p) => ctx.decode_table(p).lookup(v),
        None => v,
    }
}

/// Multiply a column-major 3x3 matrix with a vector.
#[inline]
fn mul(m: &[f32; 9], v: [f32; 3]) -> [f32; 3] {
    [
        m[0] * v[0] + m[3] * v[1] + m[6] * v[2],
        m[1] * v[0] + m[4] * v[1] + m[7] * v[2],
        m[2] * v[0] + m[5] * v[1] + m[8] * v[2],
    ]
}

/// Convert CIE XYZ to sRGB.
pub(crate) fn xyz_to_srgb([x, y, z]: [f32; 3]) -> [f32; 3] {
    let linear = [
        3.2406 * x - 1.5372 * y - 0.4986 * z,
        -0.9689 * x + 1.8758 * y + 0.0415 * z,
        0.0557 * x - 0.2040 * y + 1.0570 * z,
    ];

    linear.map(|u| {
        let c = if u <= 0.0031308 {
            12.92 * u
        } else {
            1.055 * u.powf(1.0 / 2.4) - 0.055
        };

        if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) }
    })
}
