//! Procedural frame generators.
//!
//! Generators honor the frame-source contract: infinite, sized by the
//! caller, and stateless across seeks (everything is a function of the
//! render-context clock).

use lumen_core::{Frame, Generator, ParamDescriptor, ParamMap, RenderContext};

/// A single solid color.
#[derive(Debug, Default)]
pub struct Solid;

impl Solid {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] =
        &[ParamDescriptor::color("color", [255, 255, 255])];

    /// Create the generator.
    pub fn new() -> Self {
        Self
    }
}

impl Generator for Solid {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        params: &ParamMap,
        _ctx: &RenderContext,
    ) -> Frame {
        let color = params
            .get("color")
            .and_then(|v| v.as_color())
            .unwrap_or([255, 255, 255]);
        Frame::solid(width, height, color)
    }
}

/// A two-color linear gradient, optionally scrolling.
#[derive(Debug, Default)]
pub struct Gradient;

impl Gradient {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::color("start_color", [255, 0, 0]),
        ParamDescriptor::color("end_color", [0, 0, 255]),
        ParamDescriptor::select("direction", "horizontal", &["horizontal", "vertical"]),
        ParamDescriptor::float("scroll_speed", 0.0, -5.0, 5.0),
    ];

    /// Create the generator.
    pub fn new() -> Self {
        Self
    }
}

impl Generator for Gradient {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        params: &ParamMap,
        ctx: &RenderContext,
    ) -> Frame {
        let start = params
            .get("start_color")
            .and_then(|v| v.as_color())
            .unwrap_or([255, 0, 0]);
        let end = params
            .get("end_color")
            .and_then(|v| v.as_color())
            .unwrap_or([0, 0, 255]);
        let horizontal = params
            .get("direction")
            .and_then(|v| v.as_text())
            .unwrap_or("horizontal")
            == "horizontal";
        let speed = params
            .get("scroll_speed")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let offset = (ctx.time_s * speed).fract() as f32;

        Frame::from_fn(width, height, |x, y| {
            let span = if horizontal {
                width.max(1)
            } else {
                height.max(1)
            };
            let pos = if horizontal { x } else { y };
            let t = ((pos as f32 / span as f32) + offset).rem_euclid(1.0);
            [
                lerp(start[0], end[0], t),
                lerp(start[1], end[1], t),
                lerp(start[2], end[2], t),
            ]
        })
    }
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
}

/// Classic sine-field plasma.
#[derive(Debug, Default)]
pub struct Plasma;

impl Plasma {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("speed", 1.0, 0.0, 5.0),
        ParamDescriptor::float("scale", 2.0, 0.1, 10.0),
    ];

    /// Create the generator.
    pub fn new() -> Self {
        Self
    }
}

impl Generator for Plasma {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        params: &ParamMap,
        ctx: &RenderContext,
    ) -> Frame {
        let speed = params.get("speed").and_then(|v| v.as_f64()).unwrap_or(1.0);
        let scale = params
            .get("scale")
            .and_then(|v| v.as_f32())
            .unwrap_or(2.0)
            .max(0.1);
        let t = (ctx.time_s * speed) as f32;

        Frame::from_fn(width, height, |x, y| {
            let nx = x as f32 / width.max(1) as f32 * scale;
            let ny = y as f32 / height.max(1) as f32 * scale;
            let v = (nx * 6.0 + t).sin()
                + ((ny * 6.0 + t * 0.7).sin())
                + (((nx + ny) * 4.0 + t * 1.3).sin())
                + ((nx.hypot(ny) * 8.0 - t).sin());
            let n = (v / 4.0 + 1.0) / 2.0;
            [
                ((n * std::f32::consts::PI).sin() * 255.0) as u8,
                (((n + 1.0 / 3.0) * std::f32::consts::PI).sin().abs() * 255.0) as u8,
                (((n + 2.0 / 3.0) * std::f32::consts::PI).sin().abs() * 255.0) as u8,
            ]
        })
    }
}

/// A colored bar sweeping across the canvas.
#[derive(Debug, Default)]
pub struct Scan;

impl Scan {
    /// Parameter schema.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::color("color", [255, 255, 255]),
        ParamDescriptor::float("speed", 1.0, 0.0, 10.0),
        ParamDescriptor::float("width_pct", 0.1, 0.01, 1.0),
    ];

    /// Create the generator.
    pub fn new() -> Self {
        Self
    }
}

impl Generator for Scan {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        params: &ParamMap,
        ctx: &RenderContext,
    ) -> Frame {
        let color = params
            .get("color")
            .and_then(|v| v.as_color())
            .unwrap_or([255, 255, 255]);
        let speed = params.get("speed").and_then(|v| v.as_f64()).unwrap_or(1.0);
        let bar = params
            .get("width_pct")
            .and_then(|v| v.as_f32())
            .unwrap_or(0.1);
        let center = (ctx.time_s * speed).fract() as f32;
        let half = bar / 2.0;

        Frame::from_fn(width, height, |x, _| {
            let pos = x as f32 / width.max(1) as f32;
            // Wrapped distance so the bar sweeps seamlessly off one
            // edge and onto the other.
            let dist = (pos - center).abs();
            let dist = dist.min(1.0 - dist);
            if dist <= half { color } else { [0, 0, 0] }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ParamValue, default_params};

    #[test]
    fn solid_fills_requested_size() {
        let mut generator = Solid::new();
        let mut params = default_params(Solid::PARAMS);
        params.insert("color".into(), ParamValue::Color([1, 2, 3]));
        let frame = generator.generate(5, 3, &params, &RenderContext::start(30.0));
        assert_eq!(frame.dimensions(), (5, 3));
        assert_eq!(frame.pixel(4, 2), [1, 2, 3]);
    }

    #[test]
    fn gradient_endpoints() {
        let mut generator = Gradient::new();
        let params = default_params(Gradient::PARAMS);
        let frame = generator.generate(10, 1, &params, &RenderContext::start(30.0));
        let [r0, _, b0] = frame.pixel(0, 0);
        let [r9, _, b9] = frame.pixel(9, 0);
        assert!(r0 > 200 && b0 < 60);
        assert!(r9 < 60 && b9 > 200);
    }

    #[test]
    fn plasma_is_deterministic_for_a_tick() {
        let mut generator = Plasma::new();
        let params = default_params(Plasma::PARAMS);
        let ctx = RenderContext::start(30.0);
        let a = generator.generate(8, 8, &params, &ctx);
        let b = generator.generate(8, 8, &params, &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn scan_bar_is_narrow() {
        let mut generator = Scan::new();
        let params = default_params(Scan::PARAMS);
        let frame = generator.generate(100, 1, &params, &RenderContext::start(30.0));
        let lit = (0..100).filter(|&x| frame.pixel(x, 0) != [0, 0, 0]).count();
        assert!(lit > 0 && lit < 20, "lit {lit} columns");
    }
}
