//! Hyperstreamline tracing runner.

use crate::field::WasmTensorField;
use fieldline_core::geom::Point2;
use fieldline_core::solvers::Rkf45Settings;
use fieldline_core::streamline::{trace_hyperstreamline, PrincipalFamily, Streamline};
use js_sys::Float64Array;
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

fn parse_family(name: &str) -> Result<PrincipalFamily, String> {
    match name {
        "major" | "1" => Ok(PrincipalFamily::Major),
        "minor" | "2" => Ok(PrincipalFamily::Minor),
        other => Err(format!("Unknown principal family '{}'", other)),
    }
}

/// Vertices as `[x0, y0, x1, y1, ...]`.
fn interleave(line: &Streamline) -> Vec<f64> {
    line.points().iter().flat_map(|p| [p.x, p.y]).collect()
}

#[wasm_bindgen]
impl WasmTensorField {
    /// Traces the `family` hyperstreamline through `(x, y)` both ways and returns the
    /// vertices interleaved.
    pub fn trace_hyperstreamline(
        &self,
        x: f64,
        y: f64,
        family: &str,
        max_steps: u32,
        settings_val: JsValue,
    ) -> Result<Float64Array, JsValue> {
        let family = parse_family(family).map_err(|e| JsValue::from_str(&e))?;
        let settings = if settings_val.is_undefined() || settings_val.is_null() {
            Rkf45Settings::default()
        } else {
            from_value(settings_val)
                .map_err(|e| JsValue::from_str(&format!("Invalid integrator settings: {}", e)))?
        };
        let line = trace_hyperstreamline(
            &self.analysis.field,
            family,
            Point2::new(x, y),
            &settings,
            max_steps as usize,
        )
        .map_err(|e| JsValue::from_str(&format!("Hyperstreamline trace failed: {}", e)))?;
        Ok(Float64Array::from(interleave(&line).as_slice()))
    }
}
