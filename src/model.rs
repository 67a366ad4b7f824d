//! Core, format-agnostic data model (spec.md §3): blockettes, stages,
//! channels, and the computed response.
//!
//! Mirrors the split in the teacher crate between wire-format structs and a
//! frozen in-memory model: [`Channel`] is assembled by [`crate::parser`],
//! ordered and checked by [`crate::validate`], and only ever read afterward
//! by [`crate::eval`].

use num_complex::Complex64;

use crate::units::ParsedUnit;

/// Complex-valued transfer function sample, `(re, im)`.
pub type Cplx = Complex64;

/// Laplace/Z-transform flavor a `PolesZeros` blockette (B53/43) was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PzKind {
    LaplaceAnalog,
    LaplaceDigital,
    Iir,
}

/// FIR coefficient symmetry (spec.md §3, §4.5 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FirSymmetry {
    Asym,
    SymOdd,
    SymEven,
}

/// One complex pole or zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoleZero {
    pub re: f64,
    pub im: f64,
}

impl PoleZero {
    pub fn as_cplx(&self) -> Cplx {
        Cplx::new(self.re, self.im)
    }
}

/// Poles & zeros filter payload (B53/43).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolesZeros {
    pub kind: PzKind,
    pub a0: f64,
    pub a0_freq: f64,
    pub zeros: Vec<PoleZero>,
    pub poles: Vec<PoleZero>,
}

/// Rational-coefficient filter payload (B54/44), analog or IIR-digital
/// depending on whether `denominators` is non-empty.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coefficients {
    pub numerators: Vec<f64>,
    pub denominators: Vec<f64>,
    pub h0: Option<f64>,
}

/// FIR filter payload (B61/41).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fir {
    pub symmetry: FirSymmetry,
    pub coeffs: Vec<f64>,
    pub h0: f64,
}

/// Tabulated (frequency, amplitude, phase) response payload (B55/45).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListResponse {
    pub freqs: Vec<f64>,
    pub amps: Vec<f64>,
    /// Phase in degrees.
    pub phases: Vec<f64>,
}

/// Generic, corner-frequency/slope payload (B56/46). Per spec.md §4.6 the
/// evaluator emits unity for this kind; the content is retained only for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Generic {
    pub corner_freqs: Vec<f64>,
    pub corner_slopes: Vec<f64>,
}

/// Decimation payload (B57/47).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decimation {
    pub sample_interval: f64,
    pub factor: u32,
    pub offset: u32,
    pub estimated_delay: f64,
    pub applied_correction: f64,
}

/// Gain payload (B58/48). Calibration rows are read and discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gain {
    pub gain: f64,
    pub gain_freq: f64,
}

/// Reference payload (B60): metadata only, contributes nothing to the
/// stage's transfer function product.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reference {
    pub num_stages: u32,
    pub stage_num: u32,
    pub num_responses: u32,
}

/// Approximation family for a [`Polynomial`] blockette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApproximationType {
    MaclaurinPolynomial,
}

/// Polynomial (nonlinear sensor) payload (B62/42).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polynomial {
    pub approximation_type: ApproximationType,
    pub frequency_lower_bound: f64,
    pub frequency_upper_bound: f64,
    pub approximation_lower_bound: f64,
    pub approximation_upper_bound: f64,
    pub max_abs_error: f64,
    pub coefficients: Vec<f64>,
    pub coefficient_errors: Vec<f64>,
}

/// Tagged union over the blockette kinds of spec.md §3. Exactly one payload
/// per instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Blockette {
    PolesZeros(PolesZeros),
    Coefficients(Coefficients),
    Fir(Fir),
    List(ListResponse),
    Generic(Generic),
    Decimation(Decimation),
    Gain(Gain),
    Reference(Reference),
    Polynomial(Polynomial),
}

impl Blockette {
    /// Human-readable tag, used in error messages and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Blockette::PolesZeros(_) => "PolesZeros",
            Blockette::Coefficients(_) => "Coefficients",
            Blockette::Fir(_) => "Fir",
            Blockette::List(_) => "List",
            Blockette::Generic(_) => "Generic",
            Blockette::Decimation(_) => "Decimation",
            Blockette::Gain(_) => "Gain",
            Blockette::Reference(_) => "Reference",
            Blockette::Polynomial(_) => "Polynomial",
        }
    }

    /// `true` for the blockette kinds spec.md §3/§4.5 calls "filter" blockettes
    /// (everything that isn't `Reference`, `Decimation`, or `Gain`).
    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            Blockette::PolesZeros(_)
                | Blockette::Coefficients(_)
                | Blockette::Fir(_)
                | Blockette::List(_)
                | Blockette::Generic(_)
                | Blockette::Polynomial(_)
        )
    }
}

/// A numbered group of blockettes constituting one signal-processing step.
/// `sequence_no = 0` denotes the overall-sensitivity stage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stage {
    pub sequence_no: u16,
    pub input_unit: ParsedUnit,
    pub output_unit: ParsedUnit,
    pub blockettes: Vec<Blockette>,
}

impl Stage {
    /// `true` if this stage carries only a `Gain` blockette (spec.md §3).
    pub fn is_gain_only(&self) -> bool {
        self.blockettes.len() == 1 && matches!(self.blockettes[0], Blockette::Gain(_))
    }

    pub fn filter(&self) -> Option<&Blockette> {
        self.blockettes.iter().find(|b| b.is_filter())
    }

    pub fn decimation(&self) -> Option<&Decimation> {
        self.blockettes.iter().find_map(|b| match b {
            Blockette::Decimation(d) => Some(d),
            _ => None,
        })
    }

    pub fn gain(&self) -> Option<&Gain> {
        self.blockettes.iter().find_map(|b| match b {
            Blockette::Gain(g) => Some(g),
            _ => None,
        })
    }
}

/// A single channel's full instrument-response description: identifiers,
/// validity interval, accumulated delay/correction terms, and the ordered
/// stage list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    pub station: String,
    pub network: String,
    pub location: String,
    pub channel: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,

    pub reported_sensitivity: f64,
    pub reported_sensitivity_freq: f64,
    pub computed_sensitivity: f64,
    pub computed_delay: f64,
    pub estimated_delay: f64,
    pub applied_correction: f64,
    pub sample_interval: f64,

    /// Index 0, if present, is the overall-sensitivity stage; the rest are
    /// physical stages in strictly increasing `sequence_no`.
    pub stages: Vec<Stage>,
}

impl Channel {
    /// The overall-sensitivity stage (`sequence_no == 0`), if the channel has one.
    pub fn sensitivity_stage(&self) -> Option<&Stage> {
        self.stages.first().filter(|s| s.sequence_no == 0)
    }

    /// Physical stages (`sequence_no >= 1`) in ascending order.
    pub fn physical_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(|s| s.sequence_no != 0)
    }
}

/// Computed complex transfer function for one channel, sampled at requested
/// frequencies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub freqs: Vec<f64>,
    pub values: Vec<Cplx>,
}
