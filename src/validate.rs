//! Channel validation and normalization (spec.md §4.5), grounded in
//! `evalresp`'s `check_channel`/`check_sym` (see
//! `examples/original_source/libsrc/evalresp/resp_fctns.c`).
//!
//! Stage ordering is already canonical by construction (the assembler emits
//! `[Reference?, Filter, Decimation?, Gain]` directly), so this module's
//! remaining responsibilities are: FIR symmetry verification and
//! renormalization, unit continuity between stages, the decimation-presence
//! requirement for digital filter kinds, and channel-level delay/correction/
//! sample-interval accumulation.

use crate::error::{RespError, Result};
use crate::model::{Blockette, Channel, Fir, FirSymmetry, PzKind};

/// Tolerance for FIR coefficient-sum renormalization (evalresp's
/// `FIR_NORM_TOL`). A digital FIR filter's coefficients should sum to unity
/// gain at DC; drift beyond this is renormalized rather than rejected.
pub const FIR_NORM_TOL: f64 = 0.02;

/// Run every check in spec.md §4.5 over `channel`, mutating it in place with
/// derived fields (FIR renormalization factors, accumulated delay/correction/
/// sample interval, computed sensitivity).
pub fn validate_channel(channel: &mut Channel) -> Result<()> {
    check_list_exclusivity(channel)?;
    normalize_fir_stages(channel);
    check_unit_continuity(channel)?;
    check_decimation_presence(channel)?;
    accumulate_timing(channel);
    compute_sensitivity(channel);
    Ok(())
}

/// spec.md §4.5 step 9: a `List` stage must be the sole non-gain-only filter
/// stage in the channel.
fn check_list_exclusivity(channel: &Channel) -> Result<()> {
    let filter_stages: Vec<_> = channel
        .physical_stages()
        .filter_map(|s| s.filter().map(|f| (s.sequence_no, f)))
        .collect();
    let has_list = filter_stages.iter().any(|(_, f)| matches!(f, Blockette::List(_)));
    if has_list && filter_stages.len() > 1 {
        return Err(RespError::UnsupportedFilterType(format!(
            "channel {}.{}.{}.{}: a List blockette cannot be mixed with other filter blockettes",
            channel.network, channel.station, channel.location, channel.channel
        )));
    }
    Ok(())
}

/// For every FIR stage: upgrade a declared-asymmetric FIR to symmetric,
/// truncating its stored array, if its full coefficient array is bit-exact
/// palindromic (spec.md §4.5 step 4), then renormalize so the coefficient
/// sum is unity gain within [`FIR_NORM_TOL`].
fn normalize_fir_stages(channel: &mut Channel) {
    for stage in channel.stages.iter_mut() {
        for blkt in stage.blockettes.iter_mut() {
            if let Blockette::Fir(fir) = blkt {
                verify_symmetry(fir, stage.sequence_no);
                renormalize(fir, stage.sequence_no);
            }
        }
    }
}

/// Detect and truncate symmetry on a declared-`Asym` FIR, mirroring
/// `check_sym` (resp_fctns.c:543-565): an even-length palindrome becomes
/// `SymEven` with the array truncated to its first half; an odd-length
/// palindrome becomes `SymOdd` truncated to its first half plus centre tap.
/// A FIR already declared `SymOdd`/`SymEven` is trusted as-is — its stored
/// array is the half-length convention by definition, so it is never itself
/// expected to be a literal palindrome.
fn verify_symmetry(fir: &mut Fir, seq: u16) {
    if fir.symmetry != FirSymmetry::Asym {
        return;
    }
    let nc = fir.coeffs.len();
    if nc == 0 {
        return;
    }
    if nc % 2 == 0 {
        let n0 = nc / 2;
        let is_palindrome = (0..n0).all(|k| fir.coeffs[n0 + k] == fir.coeffs[n0 - k - 1]);
        if is_palindrome {
            log::warn!("stage {seq}: asymmetric FIR is palindromic; reclassifying as SymEven");
            fir.coeffs.truncate(n0);
            fir.symmetry = FirSymmetry::SymEven;
        }
    } else {
        let n0 = (nc - 1) / 2;
        let is_palindrome = (1..nc - n0).all(|k| fir.coeffs[n0 + k] == fir.coeffs[n0 - k]);
        if is_palindrome {
            log::warn!("stage {seq}: asymmetric FIR is palindromic; reclassifying as SymOdd");
            fir.coeffs.truncate(nc - n0);
            fir.symmetry = FirSymmetry::SymOdd;
        }
    }
}

/// The true (full) coefficient count a stored FIR array represents, per
/// spec.md §4.5 step 8.
fn nc_effective(fir: &Fir) -> usize {
    let n = fir.coeffs.len();
    match fir.symmetry {
        FirSymmetry::SymOdd => 2 * n - 1,
        FirSymmetry::SymEven => 2 * n,
        FirSymmetry::Asym => n,
    }
}

fn renormalize(fir: &mut Fir, seq: u16) {
    let sum: f64 = fir.coeffs.iter().sum();
    if sum == 0.0 {
        fir.h0 = 1.0;
        return;
    }
    if (sum - 1.0).abs() > FIR_NORM_TOL {
        log::warn!(
            "stage {seq}: FIR coefficients sum to {sum:.6}, outside the \
             {FIR_NORM_TOL} tolerance of unity gain; renormalizing"
        );
        fir.h0 = 1.0 / sum;
    } else {
        fir.h0 = 1.0;
    }
}

/// A stage operates in the discrete-time (digital) domain if it's FIR,
/// IIR poles/zeros, or digital (denominator-bearing) Coefficients — all of
/// which require an accompanying Decimation blockette.
fn is_digital_filter(blkt: &Blockette) -> bool {
    match blkt {
        Blockette::Fir(_) => true,
        Blockette::PolesZeros(pz) => pz.kind == PzKind::Iir,
        Blockette::Coefficients(c) => !c.denominators.is_empty(),
        _ => false,
    }
}

fn check_unit_continuity(channel: &Channel) -> Result<()> {
    let stages: Vec<_> = channel.physical_stages().collect();
    for pair in stages.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let prev_is_default = prev.output_unit.unit == crate::units::Unit::Default;
        let next_is_default = next.input_unit.unit == crate::units::Unit::Default;
        if !prev_is_default && !next_is_default && prev.output_unit.unit != next.input_unit.unit {
            return Err(RespError::IllegalRespFormat(format!(
                "unit discontinuity between stage {} (output {:?}) and stage {} (input {:?})",
                prev.sequence_no, prev.output_unit.unit, next.sequence_no, next.input_unit.unit
            )));
        }
    }
    Ok(())
}

fn check_decimation_presence(channel: &Channel) -> Result<()> {
    for stage in channel.physical_stages() {
        if let Some(filter) = stage.filter() {
            if is_digital_filter(filter) && stage.decimation().is_none() {
                return Err(RespError::IllegalRespFormat(format!(
                    "stage {} uses a digital filter ({}) but has no Decimation blockette",
                    stage.sequence_no,
                    filter.kind_name()
                )));
            }
        }
    }
    Ok(())
}

/// Accumulate channel-level timing (spec.md §4.5 step 8): `estimated_delay`
/// and `applied_correction` sum across every stage's Decimation blockette;
/// `computed_delay` separately accumulates each FIR stage's group delay,
/// `((nc_effective - 1)/2) * sample_interval`, grounded on `check_channel`'s
/// `chan->calc_delay` accumulation (resp_fctns.c:414-415). The channel's
/// overall sample interval is the output interval after the last decimating
/// stage.
fn accumulate_timing(channel: &mut Channel) {
    let mut estimated_delay = 0.0;
    let mut applied_correction = 0.0;
    let mut sample_interval = 0.0;
    let mut computed_delay = 0.0;
    for stage in channel.physical_stages() {
        if let Some(d) = stage.decimation() {
            if let Some(Blockette::Fir(fir)) = stage.filter() {
                let nc = nc_effective(fir);
                if nc > 0 {
                    computed_delay += ((nc - 1) as f64 / 2.0) * d.sample_interval;
                }
            }
            estimated_delay += d.estimated_delay;
            applied_correction += d.applied_correction;
            sample_interval = d.sample_interval * d.factor as f64;
        }
    }
    channel.estimated_delay = estimated_delay;
    channel.applied_correction = applied_correction;
    channel.sample_interval = sample_interval;
    channel.computed_delay = computed_delay;
}

/// Computed sensitivity is the product of every physical stage's gain;
/// logged (not an error) when it disagrees with the reported channel
/// sensitivity by more than 5%, per evalresp's informational sensitivity check.
fn compute_sensitivity(channel: &mut Channel) {
    let mut product = 1.0;
    for stage in channel.physical_stages() {
        if let Some(g) = stage.gain() {
            product *= g.gain;
        }
    }
    channel.computed_sensitivity = product;

    if channel.reported_sensitivity > 0.0 {
        let rel_diff = (product - channel.reported_sensitivity).abs() / channel.reported_sensitivity;
        if rel_diff > 0.05 {
            log::warn!(
                "channel {}.{}.{}.{}: computed sensitivity {product:.6e} differs from \
                 reported sensitivity {:.6e} by {:.1}%",
                channel.network,
                channel.station,
                channel.location,
                channel.channel,
                channel.reported_sensitivity,
                rel_diff * 100.0
            );
        }
    }
}
