//! Stepped precession runner exported to JS.

use crate::input::{series_from_columns, series_from_text, settings_from_js};
use anyhow::Context;
use js_sys::Float64Array;
use precession_core::climate::format_climate_table;
use precession_core::{
    climate_records, ClimateRecord, IntegratorSettings, OrbitalSeries, PrecessionRunner,
    SampleRecord, SampleSink,
};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::sync::Arc;
use wasm_bindgen::prelude::*;

const MAX_PREALLOCATED_CALLS: usize = 1 << 20;

/// Final payload: decimated samples, the climate columns and the same
/// columns as a tab-separated table.
#[derive(Serialize)]
struct PrecessionResult {
    samples: Vec<SampleRecord>,
    climate: Vec<ClimateRecord>,
    table: String,
}

/// WASM-exported runner for a precession integration.
/// Allows progress reporting by running batches of steps at a time.
#[wasm_bindgen]
pub struct WasmPrecessionRunner {
    runner: Option<PrecessionRunner<SampleSink>>,
}

impl WasmPrecessionRunner {
    pub(crate) fn from_parts(
        series: Arc<OrbitalSeries>,
        settings: IntegratorSettings,
    ) -> anyhow::Result<Self> {
        let expected_calls = if settings.step_years > 0.0 {
            ((settings.end_time_years() / settings.step_years).abs() as usize)
                .min(MAX_PREALLOCATED_CALLS)
        } else {
            0
        };
        let sink = SampleSink::with_capacity(settings.decimation, expected_calls);
        let runner =
            PrecessionRunner::new(series, settings, sink).context("Precession start-up failed")?;
        Ok(Self {
            runner: Some(runner),
        })
    }

    fn finish(runner: PrecessionRunner<SampleSink>) -> anyhow::Result<PrecessionResult> {
        let interpolator = runner.kernel().interpolator().clone();
        let samples = runner.into_observer().into_records();
        let climate = climate_records(&interpolator, &samples)
            .context("Failed to derive climate records")?;
        let table = format_climate_table(&climate);
        Ok(PrecessionResult {
            samples,
            climate,
            table,
        })
    }
}

#[wasm_bindgen]
impl WasmPrecessionRunner {
    /// Create a runner from a precomputed table
    /// `[t (kyr), k, h, q, p, dk, dh, dq, dp]` (one array per column).
    #[wasm_bindgen(constructor)]
    pub fn new(table_val: JsValue, settings_val: JsValue) -> Result<WasmPrecessionRunner, JsValue> {
        console_error_panic_hook::set_once();

        let columns: Vec<Vec<f64>> = from_value(table_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid element table: {}", e)))?;
        let settings = settings_from_js(settings_val)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;

        series_from_columns(&columns)
            .and_then(|series| Self::from_parts(series, settings))
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
    }

    /// Create a runner from the raw text of a published solution.
    #[wasm_bindgen(js_name = fromText)]
    pub fn from_text(
        text: &str,
        solution: &str,
        settings_val: JsValue,
    ) -> Result<WasmPrecessionRunner, JsValue> {
        console_error_panic_hook::set_once();

        let settings = settings_from_js(settings_val)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;

        series_from_text(text, solution, &settings)
            .and_then(|series| Self::from_parts(series, settings))
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
    }

    /// Check if the integration is complete.
    pub fn is_done(&self) -> bool {
        self.runner.as_ref().map_or(true, |runner| runner.is_done())
    }

    /// Run a batch of multistep steps and return progress.
    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let progress = runner
            .run_steps(batch_size as usize)
            .map_err(|e| JsValue::from_str(&format!("Precession step failed: {}", e)))?;

        to_value(&progress).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Get progress information.
    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        to_value(&runner.progress())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Get the samples recorded so far.
    pub fn get_samples(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        to_value(runner.observer().records())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Obliquity of the samples recorded so far (rad).
    pub fn get_obliquity(&self) -> Result<Float64Array, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let obliquity: Vec<f64> = runner
            .observer()
            .records()
            .iter()
            .map(|record| record.obliquity)
            .collect();
        Ok(Float64Array::from(obliquity.as_slice()))
    }

    /// Get the final result. Consumes the runner.
    pub fn get_result(&mut self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .take()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        if !runner.is_done() {
            self.runner = Some(runner);
            return Err(JsValue::from_str(
                "Integration has not finished; keep calling run_steps.",
            ));
        }

        let result = Self::finish(runner).map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;

        to_value(&result).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precession_core::{ElementSet, OrbitalSample};

    fn quiet_series() -> Arc<OrbitalSeries> {
        let samples = (0..=150)
            .map(|i| OrbitalSample {
                time_years: -1000.0 * i as f64,
                elements: ElementSet {
                    k: 0.0167,
                    ..ElementSet::default()
                },
            })
            .collect();
        Arc::new(OrbitalSeries::new(samples, -1000.0).expect("series"))
    }

    fn short_run() -> IntegratorSettings {
        IntegratorSettings {
            start_myr: -0.1,
            ..IntegratorSettings::default()
        }
    }

    #[test]
    fn runner_finishes_and_derives_climate_columns() {
        let mut runner = WasmPrecessionRunner::from_parts(quiet_series(), short_run())
            .expect("runner");
        assert!(!runner.is_done());

        let inner = runner.runner.as_mut().expect("runner");
        while !inner.is_done() {
            inner.run_steps(64).expect("batch");
        }
        assert!(runner.is_done());

        let inner = runner.runner.take().expect("runner");
        let result = WasmPrecessionRunner::finish(inner).expect("result");
        assert_eq!(result.samples.len(), 101);
        assert_eq!(result.climate.len(), result.samples.len());
        assert!((result.climate[0].eccentricity - 0.0167).abs() < 1e-12);
        assert_eq!(result.table.lines().count(), 102);
        assert!(runner.is_done(), "a consumed runner reports done");
    }

    #[test]
    fn start_up_errors_carry_context() {
        let settings = IntegratorSettings {
            start_myr: -5.0,
            ..IntegratorSettings::default()
        };
        let err = WasmPrecessionRunner::from_parts(quiet_series(), settings)
            .err()
            .expect("out of bounds");
        let message = format!("{:#}", err);
        assert!(message.starts_with("Precession start-up failed"));
        assert!(message.contains("outside the orbital series bounds"));
    }
}
