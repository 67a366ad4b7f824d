//! List-blockette cubic-spline interpolation (spec.md §4.8), grounded in
//! `evalresp`'s `interpolate_list_blockette`
//! (`examples/original_source/libsrc/evalresp/resp_fctns.c`).
//!
//! Frequencies outside the tabulated range are dropped, not clipped: a
//! dropped frequency is logged and excluded from the returned triple, and if
//! every requested frequency falls outside the table, the whole call fails
//! with [`RespError::ImproperDataType`] (spec.md §4.7). Phase is unwrapped
//! before splining so the curve has no artificial ±360° jumps, then
//! rewrapped to `(-180°, 180°]` afterward; amplitude is clamped to stay
//! positive.

use crate::error::{RespError, Result};
use crate::model::ListResponse;

/// Relative tolerance for treating a query frequency that falls just outside
/// `[freqs[0], freqs[last]]` as in range (rounding noise, not a real
/// out-of-table request).
const CLIP_RELATIVE_TOL: f64 = 1e-6;

/// Interpolate a [`ListResponse`] at `query_freqs`, blending a natural cubic
/// spline with piecewise-linear interpolation by `tension` (`0.0` = pure
/// cubic spline, `1.0` = pure piecewise-linear).
///
/// Returns `(retained_freqs, amps, phases_deg)`, all the same (possibly
/// shorter than `query_freqs`) length: any query frequency outside the
/// table's range is dropped from all three. Fails with
/// [`RespError::ImproperDataType`] if every requested frequency is out of
/// range.
pub fn interpolate(
    list: &ListResponse,
    query_freqs: &[f64],
    tension: f64,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let n = list.freqs.len();
    if n == 0 {
        return Err(RespError::ImproperDataType(
            "list blockette has no tabulated points".into(),
        ));
    }
    if n == 1 {
        let lo = list.freqs[0];
        let retained: Vec<f64> = query_freqs
            .iter()
            .copied()
            .filter(|&f| in_range(f, lo, lo))
            .collect();
        if retained.is_empty() {
            return Err(RespError::ImproperDataType(format!(
                "all requested frequencies fall outside the list blockette's single point {lo} Hz"
            )));
        }
        let len = retained.len();
        return Ok((retained, vec![list.amps[0]; len], vec![list.phases[0]; len]));
    }

    let lo = list.freqs[0];
    let hi = list.freqs[n - 1];
    let amp_floor = {
        let min_amp = list.amps.iter().cloned().fold(f64::INFINITY, f64::min);
        if min_amp > 0.0 {
            min_amp / 10.0
        } else {
            0.0
        }
    };

    let unwrapped_phase = unwrap_degrees(&list.phases);
    let amp_spline = CubicSpline::fit(&list.freqs, &list.amps);
    let phase_spline = CubicSpline::fit(&list.freqs, &unwrapped_phase);

    let mut retained = Vec::with_capacity(query_freqs.len());
    let mut amps = Vec::with_capacity(query_freqs.len());
    let mut phases = Vec::with_capacity(query_freqs.len());
    for &f in query_freqs {
        if !in_range(f, lo, hi) {
            log::warn!(
                "requested frequency {f} Hz outside list blockette range \
                 [{lo}, {hi}] Hz; dropping from the response"
            );
            continue;
        }
        let clamped = f.clamp(lo, hi);

        let amp = tension_blend(
            amp_spline.eval(clamped),
            linear_eval(&list.freqs, &list.amps, clamped),
            tension,
        )
        .max(amp_floor);
        let phase = tension_blend(
            phase_spline.eval(clamped),
            linear_eval(&list.freqs, &unwrapped_phase, clamped),
            tension,
        );

        retained.push(f);
        amps.push(amp);
        phases.push(rewrap_degrees(phase));
    }

    if retained.is_empty() {
        return Err(RespError::ImproperDataType(format!(
            "all requested frequencies fall outside the list blockette range [{lo}, {hi}] Hz"
        )));
    }

    Ok((retained, amps, phases))
}

/// `true` if `f` is within `[lo, hi]`, allowing [`CLIP_RELATIVE_TOL`] of
/// slack for rounding noise right at an endpoint.
fn in_range(f: f64, lo: f64, hi: f64) -> bool {
    let tol = CLIP_RELATIVE_TOL * lo.abs().max(hi.abs()).max(1.0);
    f >= lo - tol && f <= hi + tol
}

fn tension_blend(cubic: f64, linear: f64, tension: f64) -> f64 {
    let t = tension.clamp(0.0, 1.0);
    (1.0 - t) * cubic + t * linear
}

/// Unwrap a degree-valued sequence so consecutive differences stay within
/// ±180°, adding or subtracting multiples of 360° as needed.
fn unwrap_degrees(phases: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phases.len());
    if phases.is_empty() {
        return out;
    }
    out.push(phases[0]);
    for &raw in &phases[1..] {
        let prev = *out.last().unwrap();
        let mut p = raw;
        while p - prev > 180.0 {
            p -= 360.0;
        }
        while p - prev < -180.0 {
            p += 360.0;
        }
        out.push(p);
    }
    out
}

/// Wrap a degree value into `(-180°, 180°]`.
fn rewrap_degrees(p: f64) -> f64 {
    let mut x = p % 360.0;
    if x <= -180.0 {
        x += 360.0;
    } else if x > 180.0 {
        x -= 360.0;
    }
    x
}

fn linear_eval(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let i = segment_index(xs, x);
    let (x0, x1) = (xs[i], xs[i + 1]);
    let (y0, y1) = (ys[i], ys[i + 1]);
    if (x1 - x0).abs() < f64::EPSILON {
        y0
    } else {
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

fn segment_index(xs: &[f64], x: f64) -> usize {
    match xs.binary_search_by(|probe| probe.partial_cmp(&x).unwrap()) {
        Ok(i) => i.min(xs.len() - 2),
        Err(0) => 0,
        Err(i) if i >= xs.len() => xs.len() - 2,
        Err(i) => i - 1,
    }
}

/// Natural cubic spline over a sorted, unique `x` grid.
struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    fn fit(xs: &[f64], ys: &[f64]) -> Self {
        let n = xs.len();
        let mut m = vec![0.0; n];
        if n < 3 {
            return CubicSpline {
                xs: xs.to_vec(),
                ys: ys.to_vec(),
                m,
            };
        }

        // Standard tridiagonal solve for natural cubic spline second
        // derivatives (Thomas algorithm).
        let mut a = vec![0.0; n];
        let mut b = vec![0.0; n];
        let mut c = vec![0.0; n];
        let mut d = vec![0.0; n];
        b[0] = 1.0;
        b[n - 1] = 1.0;
        for i in 1..n - 1 {
            let h_im1 = xs[i] - xs[i - 1];
            let h_i = xs[i + 1] - xs[i];
            a[i] = h_im1;
            b[i] = 2.0 * (h_im1 + h_i);
            c[i] = h_i;
            d[i] = 6.0
                * ((ys[i + 1] - ys[i]) / h_i - (ys[i] - ys[i - 1]) / h_im1);
        }
        // Forward elimination.
        for i in 1..n {
            let w = a[i] / b[i - 1];
            b[i] -= w * c[i - 1];
            d[i] -= w * d[i - 1];
        }
        m[n - 1] = d[n - 1] / b[n - 1];
        for i in (0..n - 1).rev() {
            m[i] = (d[i] - c[i] * m[i + 1]) / b[i];
        }

        CubicSpline {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
        }
    }

    fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }
        if n == 2 {
            return linear_eval(&self.xs, &self.ys, x);
        }
        let i = segment_index(&self.xs, x);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let h = x1 - x0;
        if h.abs() < f64::EPSILON {
            return self.ys[i];
        }
        let a = (x1 - x) / h;
        let b = (x - x0) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a.powi(3) - a) * self.m[i] + (b.powi(3) - b) * self.m[i + 1]) * (h * h) / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> ListResponse {
        ListResponse {
            freqs: vec![0.1, 1.0, 10.0, 100.0],
            amps: vec![1.0, 10.0, 100.0, 1000.0],
            phases: vec![170.0, -170.0, 170.0, -170.0],
        }
    }

    #[test]
    fn exact_knot_returns_original_value() {
        let list = sample_list();
        let (freqs, amps, phases) = interpolate(&list, &[1.0], 0.0).unwrap();
        assert_eq!(freqs, vec![1.0]);
        assert!((amps[0] - 10.0).abs() < 1e-9);
        assert!((phases[0] - (-170.0)).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_request_is_dropped() {
        let list = sample_list();
        let (freqs, amps, _) = interpolate(&list, &[10.0, 1000.0], 0.0).unwrap();
        assert_eq!(freqs, vec![10.0]);
        assert_eq!(amps.len(), 1);
    }

    #[test]
    fn all_out_of_range_fails() {
        let list = sample_list();
        let err = interpolate(&list, &[1000.0, 2000.0], 0.0).unwrap_err();
        assert!(matches!(err, RespError::ImproperDataType(_)));
    }

    #[test]
    fn phase_unwrap_avoids_spurious_jump() {
        let list = sample_list();
        let (_, _, phases) = interpolate(&list, &[0.5, 5.0, 50.0], 0.0).unwrap();
        for p in phases {
            assert!((-180.0..=180.0).contains(&p));
        }
    }

    #[test]
    fn amplitude_never_goes_negative() {
        let list = ListResponse {
            freqs: vec![1.0, 2.0, 3.0],
            amps: vec![0.01, 0.001, 0.01],
            phases: vec![0.0, 0.0, 0.0],
        };
        let (_, amps, _) = interpolate(&list, &[1.5, 2.5], 0.0).unwrap();
        for a in amps {
            assert!(a > 0.0);
        }
    }

    #[test]
    fn tension_one_matches_linear_interpolation() {
        let list = sample_list();
        let (_, amps, _) = interpolate(&list, &[0.55], 1.0).unwrap();
        let expected = linear_eval(&list.freqs, &list.amps, 0.55);
        assert!((amps[0] - expected).abs() < 1e-9);
    }
}
