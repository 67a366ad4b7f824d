//! Per-blockette transfer function evaluators (spec.md §4.6), grounded in
//! `evalresp`'s `calc_resp`/`evaluate_filter`
//! (`examples/original_source/libsrc/evalresp/resp_fctns.c`).

use std::f64::consts::PI;

use crate::interpolate;
use crate::model::{
    Blockette, Coefficients, Cplx, Decimation, Fir, FirSymmetry, Gain, Generic, ListResponse,
    Polynomial, PolesZeros, PzKind, Stage,
};

/// Evaluate one filter-bearing [`Blockette`] at `freq_hz`.
///
/// `sample_interval` is the enclosing stage's decimation sample interval,
/// needed by the discrete-time evaluators (IIR poles/zeros, digital
/// Coefficients, FIR); `tension` configures [`interpolate::interpolate`] for
/// List blockettes; `poly_eval_point` is the amplitude at which a
/// `Polynomial` blockette's derivative is taken.
pub fn evaluate_filter(
    blkt: &Blockette,
    freq_hz: f64,
    sample_interval: f64,
    tension: f64,
    poly_eval_point: f64,
) -> Cplx {
    match blkt {
        Blockette::PolesZeros(pz) => eval_poles_zeros(pz, freq_hz, sample_interval),
        Blockette::Coefficients(c) => eval_coefficients(c, freq_hz, sample_interval),
        Blockette::Fir(fir) => eval_fir(fir, freq_hz, sample_interval),
        Blockette::List(list) => eval_list(list, freq_hz, tension),
        Blockette::Generic(g) => eval_generic(g),
        Blockette::Polynomial(p) => eval_polynomial(p, poly_eval_point),
        // Reference/Decimation/Gain aren't filters; evaluate_stage handles
        // Decimation/Gain's own contributions separately.
        Blockette::Decimation(_) | Blockette::Gain(_) | Blockette::Reference(_) => {
            Cplx::new(1.0, 0.0)
        }
    }
}

fn eval_poles_zeros(pz: &PolesZeros, freq_hz: f64, sample_interval: f64) -> Cplx {
    let s = match pz.kind {
        PzKind::Iir => {
            let omega_t = 2.0 * PI * freq_hz * sample_interval;
            Cplx::from_polar(1.0, omega_t) // z = e^{jωT}
        }
        PzKind::LaplaceAnalog | PzKind::LaplaceDigital => Cplx::new(0.0, 2.0 * PI * freq_hz),
    };
    let numer = pz
        .zeros
        .iter()
        .fold(Cplx::new(1.0, 0.0), |acc, z| acc * (s - z.as_cplx()));
    let denom = pz
        .poles
        .iter()
        .fold(Cplx::new(1.0, 0.0), |acc, p| acc * (s - p.as_cplx()));
    if denom.norm() == 0.0 {
        log::warn!("poles/zeros evaluation hit a zero denominator at {freq_hz} Hz");
        return Cplx::new(f64::INFINITY, 0.0);
    }
    pz.a0 * numer / denom
}

/// Analog rational Coefficients are a plain polynomial in `s = jω`; digital
/// (denominator-bearing) Coefficients are a rational function in `z^-1`,
/// `z = e^{jωT}`.
fn eval_coefficients(c: &Coefficients, freq_hz: f64, sample_interval: f64) -> Cplx {
    let h0 = c.h0.unwrap_or(1.0);
    if c.denominators.is_empty() {
        let s = Cplx::new(0.0, 2.0 * PI * freq_hz);
        h0 * eval_power_series(&c.numerators, s)
    } else {
        let omega_t = 2.0 * PI * freq_hz * sample_interval;
        let z_inv = Cplx::from_polar(1.0, -omega_t);
        let numer = eval_power_series(&c.numerators, z_inv);
        let denom = eval_power_series(&c.denominators, z_inv);
        if denom.norm() == 0.0 {
            log::warn!("IIR coefficients evaluation hit a zero denominator at {freq_hz} Hz");
            return Cplx::new(f64::INFINITY, 0.0);
        }
        h0 * numer / denom
    }
}

fn eval_power_series(coeffs: &[f64], x: Cplx) -> Cplx {
    let mut acc = Cplx::new(0.0, 0.0);
    let mut power = Cplx::new(1.0, 0.0);
    for c in coeffs {
        acc += *c * power;
        power *= x;
    }
    acc
}

/// The three FIR symmetry closed forms (spec.md §4.6). `fir.coeffs` holds
/// only the half-length array that the validator truncates a symmetric
/// filter down to (step 4 of §4.5); the true centre index of that stored
/// array is always its last index, `n - 1`, regardless of whether `n`
/// itself is odd or even — SymOdd's stored half includes the centre tap,
/// SymEven's doesn't, but neither convention constrains the parity of `n`.
fn eval_fir(fir: &Fir, freq_hz: f64, sample_interval: f64) -> Cplx {
    let n = fir.coeffs.len();
    let omega_t = 2.0 * PI * freq_hz * sample_interval;

    let raw = match fir.symmetry {
        FirSymmetry::SymOdd => {
            let mid = n - 1;
            let mut sum = fir.coeffs[mid];
            for (k, c) in fir.coeffs[..mid].iter().enumerate() {
                sum += 2.0 * c * (omega_t * (mid - k) as f64).cos();
            }
            Cplx::new(sum, 0.0)
        }
        FirSymmetry::SymEven => {
            let n_f = n as f64;
            let mut sum = 0.0;
            for (k, c) in fir.coeffs.iter().enumerate() {
                sum += 2.0 * c * (omega_t * (n_f - k as f64 - 0.5)).cos();
            }
            Cplx::new(sum, 0.0)
        }
        FirSymmetry::Asym => {
            let centered = Cplx::from_polar(1.0, omega_t * (n as f64 - 1.0) / 2.0);
            direct_fir_sum(&fir.coeffs, omega_t) * centered
        }
    };
    raw * fir.h0
}

fn direct_fir_sum(coeffs: &[f64], omega_t: f64) -> Cplx {
    let mut acc = Cplx::new(0.0, 0.0);
    for (k, c) in coeffs.iter().enumerate() {
        acc += Cplx::from_polar(*c, -omega_t * k as f64);
    }
    acc
}

/// Looks up a single, already range-checked frequency (the composer filters
/// out-of-range frequencies from the whole batch before ever calling into a
/// per-stage evaluator — see `eval::compose::compute_response`).
fn eval_list(list: &ListResponse, freq_hz: f64, tension: f64) -> Cplx {
    match interpolate::interpolate(list, &[freq_hz], tension) {
        Ok((_, amps, phases)) => Cplx::from_polar(amps[0], phases[0].to_radians()),
        Err(e) => {
            log::warn!("list blockette evaluation at {freq_hz} Hz failed unexpectedly: {e}");
            Cplx::new(1.0, 0.0)
        }
    }
}

/// Generic (corner-frequency/slope) blockettes evaluate to unity: their
/// content describes a nominal shape but contributes no computed gain.
fn eval_generic(_g: &Generic) -> Cplx {
    Cplx::new(1.0, 0.0)
}

/// A Maclaurin polynomial sensor response is evaluated as the derivative of
/// the fitted polynomial at the operating amplitude, not as a function of
/// frequency.
fn eval_polynomial(poly: &Polynomial, x: f64) -> Cplx {
    let mut acc = 0.0;
    let mut power = 1.0;
    for (i, c) in poly.coefficients.iter().enumerate().skip(1) {
        acc += i as f64 * c * power;
        power *= x;
    }
    Cplx::new(acc, 0.0)
}

/// Decimation's own contribution: a pure phase factor for the configured
/// delay term (spec.md §3.1's `use_estimated_delay` switch).
pub fn decimation_phase_factor(d: &Decimation, freq_hz: f64, use_estimated_delay: bool) -> Cplx {
    let delay = if use_estimated_delay {
        d.estimated_delay
    } else {
        d.applied_correction
    };
    Cplx::from_polar(1.0, -2.0 * PI * freq_hz * delay)
}

/// Gain's own contribution: a flat real scalar.
pub fn gain_factor(g: &Gain) -> Cplx {
    Cplx::new(g.gain, 0.0)
}

/// The sample interval an evaluator should use for a stage's discrete-time
/// filters: the stage's own Decimation blockette if present, `1.0` otherwise
/// (a stage with a discrete filter and no decimation fails validation before
/// evaluation is ever reached).
pub fn stage_sample_interval(stage: &Stage) -> f64 {
    stage.decimation().map(|d| d.sample_interval).unwrap_or(1.0)
}
