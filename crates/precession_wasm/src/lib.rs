//! WASM bindings for the precession core library.

use precession_core::{predicted_precession_rates, PrecessionConstants};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

mod input;
mod runner;

pub use runner::WasmPrecessionRunner;

/// Model precession rate (arcsec/yr) at the reference obliquity, from the
/// present back to `oldest_myr`.
#[wasm_bindgen]
pub fn precession_rate_curve(
    fgam: f64,
    cmar: f64,
    oldest_myr: f64,
    step_kyr: f64,
) -> Result<JsValue, JsValue> {
    let constants = PrecessionConstants::from_settings(fgam, cmar);
    let rates = predicted_precession_rates(&constants, oldest_myr * 1e6, step_kyr * 1e3)
        .map_err(|e| JsValue::from_str(&format!("Rate curve failed: {}", e)))?;

    to_value(&rates).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
