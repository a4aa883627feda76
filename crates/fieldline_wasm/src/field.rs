//! Tensor field wrapper and component queries.

use fieldline_core::analysis::{analyze_tensor_data, TensorFieldAnalysis};
use fieldline_core::quantity::TensorComponent;
use fieldline_core::FieldSettings;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmTensorField {
    pub(crate) analysis: TensorFieldAnalysis,
}

pub(crate) fn settings_from_js(settings_val: JsValue) -> Result<FieldSettings, JsValue> {
    if settings_val.is_undefined() || settings_val.is_null() {
        return Ok(FieldSettings::default());
    }
    from_value(settings_val)
        .map_err(|e| JsValue::from_str(&format!("Invalid field settings: {}", e)))
}

#[wasm_bindgen]
impl WasmTensorField {
    /// Parses `x, y, XX, YY, XY` lines and runs the full reconstruction.
    #[wasm_bindgen(constructor)]
    pub fn new(input: &str, settings_val: JsValue) -> Result<WasmTensorField, JsValue> {
        console_error_panic_hook::set_once();
        let settings = settings_from_js(settings_val)?;
        let analysis = analyze_tensor_data(input, settings)
            .map_err(|e| JsValue::from_str(&format!("Tensor field analysis failed: {:#}", e)))?;
        Ok(WasmTensorField { analysis })
    }

    pub fn sample_count(&self) -> usize {
        self.analysis.field.samples().len()
    }

    /// Domain as `[xmin, ymin, xmax, ymax]`.
    pub fn bounds(&self) -> Vec<f64> {
        let b = self.analysis.field.grid().bounds();
        vec![b.xmin, b.ymin, b.xmax, b.ymax]
    }

    /// Cell counts as `[cell_xn, cell_yn]`.
    pub fn grid_size(&self) -> Vec<u32> {
        let grid = self.analysis.field.grid();
        vec![grid.cell_xn() as u32, grid.cell_yn() as u32]
    }

    /// Interpolated `component` (e.g. `"xx"`, `"eigenvalue1"`, `"direction2"`, `"gap"`).
    pub fn value(&self, x: f64, y: f64, component: &str) -> Result<f64, JsValue> {
        let component: TensorComponent = component
            .parse()
            .map_err(|e| JsValue::from_str(&format!("{}", e)))?;
        self.analysis
            .field
            .value(x, y, component)
            .map_err(|e| JsValue::from_str(&format!("Field query failed: {}", e)))
    }

    /// Degenerate points, curves and regions as plain objects with node coordinates.
    pub fn singularities(&self) -> Result<JsValue, JsValue> {
        let reports = self
            .analysis
            .reports()
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
        to_value(&reports).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
