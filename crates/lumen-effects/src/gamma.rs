//! Gamma correction.

use lumen_core::{Frame, ParamDescriptor, ParamMap, PixelEffect, RenderContext};

/// Applies `out = in^(1/gamma)` per channel with a cached lookup table.
///
/// The 256-entry table is rebuilt only when the gamma parameter
/// changes, keeping the per-frame cost at one table lookup per byte.
#[derive(Debug)]
pub struct Gamma {
    table: [u8; 256],
    table_gamma: f32,
}

impl Gamma {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::float("gamma", 1.0, 0.1, 4.0)];

    /// Create the effect.
    pub fn new() -> Self {
        Self {
            table: identity_table(),
            table_gamma: 1.0,
        }
    }

    fn rebuild(&mut self, gamma: f32) {
        let inv = 1.0 / gamma.max(0.01);
        for (i, out) in self.table.iter_mut().enumerate() {
            let n = i as f32 / 255.0;
            *out = (n.powf(inv) * 255.0).round() as u8;
        }
        self.table_gamma = gamma;
    }
}

fn identity_table() -> [u8; 256] {
    let mut t = [0u8; 256];
    for (i, v) in t.iter_mut().enumerate() {
        *v = i as u8;
    }
    t
}

impl Default for Gamma {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelEffect for Gamma {
    fn apply(
        &mut self,
        frame: &mut Frame,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Result<(), String> {
        let gamma = params.get("gamma").and_then(|v| v.as_f32()).unwrap_or(1.0);
        if (gamma - 1.0).abs() < f32::EPSILON {
            return Ok(());
        }
        if (gamma - self.table_gamma).abs() > 1e-4 {
            self.rebuild(gamma);
        }
        for b in frame.data_mut() {
            *b = self.table[usize::from(*b)];
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.table = identity_table();
        self.table_gamma = 1.0;
    }
}
