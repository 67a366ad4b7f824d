//! Response request configuration (spec.md §5, §3.1), with a fluent builder
//! in the style of the teacher crate's `InventoryBuilder`
//! (see `builder.rs`).

use crate::units::Unit;

/// Settings controlling how a channel's stages are composed into a response
/// (spec.md §4.7, §3.1).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestConfig {
    /// Desired output unit; `Unit::Default` passes the channel's native
    /// output through unconverted.
    pub output_unit: Unit,
    /// Restrict composition to stages `>= start_stage`, if set.
    pub start_stage: Option<u16>,
    /// Restrict composition to stages `<= stop_stage`, if set.
    pub stop_stage: Option<u16>,
    /// Use each stage's estimated delay rather than its applied correction
    /// as the Decimation phase term (supplemented from the original
    /// `evalresp` engine; not present in the distilled spec).
    pub use_estimated_delay: bool,
    /// Rescale the composed response so its net gain matches the channel's
    /// reported sensitivity rather than the stage-product gain.
    pub use_total_sensitivity: bool,
    /// Tension parameter for List-blockette interpolation, `0.0`–`1.0`.
    pub tension: f64,
    /// Operating-point amplitude at which a Polynomial blockette's
    /// derivative is evaluated.
    pub poly_eval_point: f64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig {
            output_unit: Unit::Default,
            start_stage: None,
            stop_stage: None,
            use_estimated_delay: false,
            use_total_sensitivity: false,
            tension: 1.0,
            poly_eval_point: 0.0,
        }
    }
}

impl RequestConfig {
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::new()
    }
}

/// Fluent builder for [`RequestConfig`].
pub struct RequestConfigBuilder {
    config: RequestConfig,
}

impl RequestConfigBuilder {
    fn new() -> Self {
        RequestConfigBuilder {
            config: RequestConfig::default(),
        }
    }

    pub fn output_unit(mut self, unit: Unit) -> Self {
        self.config.output_unit = unit;
        self
    }

    pub fn start_stage(mut self, seq: u16) -> Self {
        self.config.start_stage = Some(seq);
        self
    }

    pub fn stop_stage(mut self, seq: u16) -> Self {
        self.config.stop_stage = Some(seq);
        self
    }

    pub fn use_estimated_delay(mut self, flag: bool) -> Self {
        self.config.use_estimated_delay = flag;
        self
    }

    pub fn use_total_sensitivity(mut self, flag: bool) -> Self {
        self.config.use_total_sensitivity = flag;
        self
    }

    pub fn tension(mut self, tension: f64) -> Self {
        self.config.tension = tension.clamp(0.0, 1.0);
        self
    }

    pub fn poly_eval_point(mut self, point: f64) -> Self {
        self.config.poly_eval_point = point;
        self
    }

    pub fn build(self) -> RequestConfig {
        self.config
    }
}
