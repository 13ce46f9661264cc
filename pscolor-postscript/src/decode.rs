//! Piecewise-linear lookup tables for single-input procedures.

use log::warn;

use crate::procedure::Procedure;

/// The number of sample points of a [`DecodeTable`].
pub const DECODE_TABLE_SIZE: usize = 256;

/// A procedure sampled at 256 evenly spaced points over `[0, 1]`.
///
/// Lookups inside `[0, 1]` interpolate linearly between adjacent samples,
/// lookups outside of it run the procedure directly.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    procedure: Procedure,
    samples: Box<[f32]>,
}

impl DecodeTable {
    /// Sample `procedure` and build a new table.
    pub fn new(procedure: Procedure) -> Self {
        let mut failed = false;

        let samples = (0..DECODE_TABLE_SIZE)
            .map(|i| {
                let x = i as f32 / (DECODE_TABLE_SIZE - 1) as f32;

                procedure.eval_single(x).unwrap_or_else(|_| {
                    failed = true;
                    x
                })
            })
            .collect();

        if failed {
            warn!("decode procedure failed for some inputs, using identity for those");
        }

        Self { procedure, samples }
    }

    /// The procedure the table was built from.
    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    /// The raw samples of the table.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Evaluate the procedure at `x`.
    pub fn lookup(&self, x: f32) -> f32 {
        if (0.0..=1.0).contains(&x) {
            let pos = x * (DECODE_TABLE_SIZE - 1) as f32;
            let idx = (pos as usize).min(DECODE_TABLE_SIZE - 2);
            let t = pos - idx as f32;

            let lo = self.samples[idx];
            let hi = self.samples[idx + 1];

            lo + t * (hi - lo)
        } else {
            self.procedure.eval_single(x).unwrap_or_else(|e| {
                warn!("decode procedure failed for input {x}: {e}");

                x
            })
        }
    }
}
