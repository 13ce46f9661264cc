//! `Indexed` color spaces.

use crate::cache::Memo;
use crate::color::tint::{TintSource, tint_to_alternate};
use crate::color::{ColorComponents, ColorSpace};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::function::lerp;
use crate::object::Object;
use std::sync::Arc;

/// The largest allowed `hival`.
pub(crate) const MAX_HIVAL: u16 = 4095;

#[derive(Debug)]
enum Lookup {
    Table(Arc<[u8]>),
    Procedure(TintSource),
}

/// An `Indexed` color space.
#[derive(Debug)]
pub(crate) struct Indexed {
    base: ColorSpace,
    hival: u16,
    lookup: Lookup,
    /// The palette converted to RGB, per default CMYK profile of the converting context.
    palettes: Memo<Option<u128>, Arc<[[f32; 3]]>>,
}

impl Indexed {
    pub(crate) fn new(array: &[Object], ctx: &Context, depth: usize) -> Result<Self> {
        let [_, base, hival, lookup] = array else {
            return Err(Error::RangeCheck);
        };

        let base = ColorSpace::new_inner(base, ctx, depth + 1)?;

        if base.is_pattern() || base.is_indexed() {
            return Err(Error::RangeCheck);
        }

        let hival = match hival {
            Object::Number(_) => hival
                .cast::<u16>()
                .filter(|h| *h <= MAX_HIVAL)
                .ok_or(Error::RangeCheck)?,
            _ => return Err(Error::TypeCheck),
        };

        let lookup = match lookup {
            Object::String(s) => Lookup::Table(s.clone()),
            Object::Stream(s) => Lookup::Table(Arc::from(s.data())),
            Object::Procedure(_) | Object::External(_) => {
                Lookup::Procedure(TintSource::new(lookup)?)
            }
            _ => return Err(Error::TypeCheck),
        };

        if let Lookup::Table(table) = &lookup
            && table.len() < (hival as usize + 1) * base.num_components()
        {
            return Err(Error::RangeCheck);
        }

        Ok(Self {
            base,
            hival,
            lookup,
            palettes: Memo::default(),
        })
    }

    pub(crate) fn base(&self) -> &ColorSpace {
        &self.base
    }

    pub(crate) fn hival(&self) -> u16 {
        self.hival
    }

    /// Map a (possibly fractional) index to a palette index.
    pub(crate) fn index(&self, value: f32) -> usize {
        if value.is_nan() {
            return 0;
        }

        (value.clamp(0.0, self.hival as f32) + 0.5) as usize
    }

    /// The components in the base space of the palette entry `index`.
    pub(crate) fn entry(&self, index: usize, ctx: &Context) -> ColorComponents {
        let index = index.min(self.hival as usize);

        match &self.lookup {
            Lookup::Table(table) => {
                let n = self.base.num_components();

                table
                    .get(index * n..(index + 1) * n)
                    .unwrap_or_default()
                    .iter()
                    .zip(self.base.component_ranges())
                    .map(|(b, (min, max))| lerp(*b as f32 / 255.0, min, max))
                    .collect()
            }
            Lookup::Procedure(p) => tint_to_alternate(p, &self.base, &[index as f32], ctx),
        }
    }

    pub(crate) fn to_rgb(&self, components: &[f32], ctx: &Context) -> [f32; 3] {
        let index = self.index(components.first().copied().unwrap_or(0.0));

        self.base.to_rgb(&self.entry(index, ctx), ctx)
    }

    /// The RGB values of all palette entries.
    pub(crate) fn palette(&self, ctx: &Context) -> Arc<[[f32; 3]]> {
        self.palettes
            .get_or_insert_with(ctx.default_cmyk_hash(), || {
                let entries = (0..=self.hival as usize)
                    .flat_map(|i| self.entry(i, ctx))
                    .collect::<Vec<_>>();

                self.base.convert_bulk(&entries, ctx).into()
            })
    }

    /// Convert many colors, given as (decoded) indices.
    pub(crate) fn convert_bulk(&self, input: &[f32], ctx: &Context) -> Vec<[f32; 3]> {
        let palette = self.palette(ctx);

        input
            .iter()
            .map(|v| palette.get(self.index(*v)).copied().unwrap_or([0.0; 3]))
            .collect()
    }
}
