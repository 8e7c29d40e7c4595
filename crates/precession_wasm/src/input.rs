//! Conversion of JS-side inputs into core types.

use anyhow::{Context, Result};
use precession_core::{
    parse_element_table, AstroSolution, IntegratorSettings, OrbitalSeries, OrbitalSeriesBuilder,
};
use serde_wasm_bindgen::from_value;
use std::sync::Arc;
use wasm_bindgen::JsValue;

/// Reads settings from a JS object; `undefined` and `null` give the defaults.
pub(crate) fn settings_from_js(settings_val: JsValue) -> Result<IntegratorSettings> {
    if settings_val.is_undefined() || settings_val.is_null() {
        return Ok(IntegratorSettings::default());
    }
    from_value(settings_val).map_err(|e| anyhow::anyhow!("Invalid integrator settings: {}", e))
}

/// Precomputed 9-column table `[t (kyr), k, h, q, p, dk, dh, dq, dp]`.
pub(crate) fn series_from_columns(columns: &[Vec<f64>]) -> Result<Arc<OrbitalSeries>> {
    let series = OrbitalSeries::from_table(columns).context("Invalid precomputed element table")?;
    Ok(Arc::new(series))
}

/// Raw solution text, windowed to the run in `settings`.
pub(crate) fn series_from_text(
    text: &str,
    solution_name: &str,
    settings: &IntegratorSettings,
) -> Result<Arc<OrbitalSeries>> {
    let solution: AstroSolution = solution_name.parse()?;
    let records = parse_element_table(text, solution)
        .with_context(|| format!("Failed to parse {} table", solution))?;
    let series = OrbitalSeriesBuilder::new(solution)
        .window(settings.start_myr, 0.0)
        .build(&records)
        .with_context(|| format!("Failed to build orbital series from {}", solution))?;
    Ok(Arc::new(series))
}
