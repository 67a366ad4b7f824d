//! Per-blockette-kind field parsers (spec.md §4.3, field layout from §6).
//!
//! Each parser consumes one contiguous run of same-numbered lines via
//! [`Block::collect`] and returns `(stage_sequence_number, Blockette)`; the
//! sequence number lets [`super::assembler`] group blockettes into stages
//! without having to special-case field numbering per kind.
//!
//! Field numbering below is our own consistent scheme built from spec.md
//! §6's field tables (which name some but not all sub-fields); gaps are
//! filled in ascending order rather than reverse-engineered from a specific
//! RESP dialect, since no byte-exact fixture corpus was available to pin
//! them down.

use crate::error::{RespError, Result};
use crate::lexer::LineReader;
use crate::model::*;
use crate::units::{parse_unit, ParsedUnit};

use super::{row_values, Block};

/// B53/43 — Poles & Zeros.
pub fn parse_poles_zeros(reader: &mut LineReader<'_>) -> Result<Option<(u16, Blockette, ParsedUnitsPair)>> {
    let Some(blk) = Block::collect(reader, 53).or_else(|| Block::collect(reader, 43)) else {
        return Ok(None);
    };
    let kind = match blk.scalar_str("03")? {
        "A" => PzKind::LaplaceAnalog,
        "B" => PzKind::LaplaceDigital,
        "D" => PzKind::Iir,
        other => {
            return Err(RespError::UnrecognizedFilterType(format!(
                "poles/zeros transfer type '{other}'"
            )))
        }
    };
    let seq = blk.scalar_u32("04")? as u16;
    let in_unit = parse_unit(blk.scalar_str("05")?)?;
    let out_unit = parse_unit(blk.scalar_str("06")?)?;
    let a0 = blk.scalar_f64("07")?;
    let a0_freq = blk.scalar_f64("08")?;

    let nzeros = blk.sum_u32("09")? as usize;
    let zero_rows = blk.rows("10-13");
    if zero_rows.len() != nzeros {
        log::warn!(
            "poles/zeros: declared {nzeros} zeros across all continuation runs, found {} rows; \
             trusting the rows",
            zero_rows.len()
        );
    }
    let zeros = zero_rows
        .iter()
        .map(|r| pole_zero_from_row(r))
        .collect::<Result<Vec<_>>>()?;

    let npoles = blk.sum_u32("14")? as usize;
    let pole_rows = blk.rows("15-18");
    if pole_rows.len() != npoles {
        log::warn!(
            "poles/zeros: declared {npoles} poles across all continuation runs, found {} rows; \
             trusting the rows",
            pole_rows.len()
        );
    }
    let poles = pole_rows
        .iter()
        .map(|r| pole_zero_from_row(r))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some((
        seq,
        Blockette::PolesZeros(PolesZeros {
            kind,
            a0,
            a0_freq,
            zeros,
            poles,
        }),
        ParsedUnitsPair { in_unit, out_unit },
    )))
}

fn pole_zero_from_row(row: &[String]) -> Result<PoleZero> {
    let v = row_values(row)?;
    let (re, im) = (
        *v.first()
            .ok_or_else(|| RespError::ArrayBoundsExceeded("pole/zero row missing real part".into()))?,
        *v.get(1)
            .ok_or_else(|| RespError::ArrayBoundsExceeded("pole/zero row missing imaginary part".into()))?,
    );
    Ok(PoleZero { re, im })
}

/// B54/44 — Coefficients (analog rational or IIR, distinguished downstream
/// by whether `denominators` is empty).
pub fn parse_coefficients(
    reader: &mut LineReader<'_>,
) -> Result<Option<(u16, Blockette, ParsedUnitsPair)>> {
    let Some(blk) = Block::collect(reader, 54).or_else(|| Block::collect(reader, 44)) else {
        return Ok(None);
    };
    let seq = blk.scalar_u32("04")? as u16;
    let in_unit = parse_unit(blk.scalar_str("05")?)?;
    let out_unit = parse_unit(blk.scalar_str("06")?)?;

    let nnumer = blk.sum_u32("07")? as usize;
    let numer_rows = blk.rows("08-09");
    if numer_rows.len() != nnumer {
        log::warn!(
            "coefficients: declared {nnumer} numerators across all continuation runs, found {} \
             rows; trusting the rows",
            numer_rows.len()
        );
    }
    let numerators = numer_rows
        .iter()
        .map(|r| Ok(*row_values(r)?.first().ok_or_else(|| {
            RespError::ArrayBoundsExceeded("numerator row missing value".into())
        })?))
        .collect::<Result<Vec<f64>>>()?;

    let ndenom = blk.sum_u32("10").unwrap_or(0) as usize;
    let denom_rows = blk.rows("11-12");
    if denom_rows.len() != ndenom {
        log::warn!(
            "coefficients: declared {ndenom} denominators across all continuation runs, found {} \
             rows; trusting the rows",
            denom_rows.len()
        );
    }
    let denominators = denom_rows
        .iter()
        .map(|r| Ok(*row_values(r)?.first().ok_or_else(|| {
            RespError::ArrayBoundsExceeded("denominator row missing value".into())
        })?))
        .collect::<Result<Vec<f64>>>()?;

    Ok(Some((
        seq,
        Blockette::Coefficients(Coefficients {
            numerators,
            denominators,
            h0: None,
        }),
        ParsedUnitsPair { in_unit, out_unit },
    )))
}

/// B61/41 — FIR.
pub fn parse_fir(reader: &mut LineReader<'_>) -> Result<Option<(u16, Blockette, ParsedUnitsPair)>> {
    let Some(blk) = Block::collect(reader, 61).or_else(|| Block::collect(reader, 41)) else {
        return Ok(None);
    };
    let seq = blk.scalar_u32("03")? as u16;
    let symmetry = match blk.scalar_str("04")? {
        "A" => FirSymmetry::Asym,
        "B" => FirSymmetry::SymOdd,
        "C" => FirSymmetry::SymEven,
        other => {
            return Err(RespError::UnrecognizedFilterType(format!(
                "FIR symmetry code '{other}'"
            )))
        }
    };
    let in_unit = parse_unit(blk.scalar_str("05")?)?;
    let out_unit = parse_unit(blk.scalar_str("06")?)?;

    // A stage can carry two consecutive same-numbered FIR runs that merge
    // into one filter (spec.md §8); each run repeats its own coefficient
    // count, so the real total is their sum, not the first run's alone.
    let ncoeffs = blk.sum_u32("07")? as usize;
    let rows = blk.rows("08-09");
    if rows.len() != ncoeffs {
        log::warn!(
            "FIR: declared {ncoeffs} coefficients across all continuation runs, found {} rows; \
             trusting the rows",
            rows.len()
        );
    }
    let coeffs = rows
        .iter()
        .map(|r| Ok(*row_values(r)?.first().ok_or_else(|| {
            RespError::ArrayBoundsExceeded("FIR coefficient row missing value".into())
        })?))
        .collect::<Result<Vec<f64>>>()?;

    Ok(Some((
        seq,
        Blockette::Fir(Fir {
            symmetry,
            coeffs,
            h0: 1.0,
        }),
        ParsedUnitsPair { in_unit, out_unit },
    )))
}

/// B55/45 — List. Each row is `[index, freq, amp, amp_err, phase, phase_err]`;
/// the index is discarded.
pub fn parse_list(reader: &mut LineReader<'_>) -> Result<Option<(u16, Blockette, ParsedUnitsPair)>> {
    let Some(blk) = Block::collect(reader, 55).or_else(|| Block::collect(reader, 45)) else {
        return Ok(None);
    };
    let seq = blk.scalar_u32("03")? as u16;
    let in_unit = parse_unit(blk.scalar_str("04")?)?;
    let out_unit = parse_unit(blk.scalar_str("05")?)?;

    let nresp = blk.sum_u32("06")? as usize;
    let rows = blk.rows("07-10");
    if rows.len() != nresp {
        log::warn!(
            "list: declared {nresp} rows across all continuation runs, found {}; trusting the rows",
            rows.len()
        );
    }
    let mut freqs = Vec::with_capacity(nresp);
    let mut amps = Vec::with_capacity(nresp);
    let mut phases = Vec::with_capacity(nresp);
    for row in &rows {
        let v = row_values(row)?;
        let (freq, amp, phase) = match v.len() {
            5 => (v[0], v[1], v[3]),
            4 => (v[0], v[1], v[2]),
            _ => {
                return Err(RespError::ArrayBoundsExceeded(
                    "list row has an unexpected number of columns".into(),
                ))
            }
        };
        freqs.push(freq);
        amps.push(amp);
        phases.push(phase);
    }

    Ok(Some((
        seq,
        Blockette::List(ListResponse {
            freqs,
            amps,
            phases,
        }),
        ParsedUnitsPair { in_unit, out_unit },
    )))
}

/// B56/46 — Generic. Evaluates to unity (spec.md §4.6); content kept for
/// diagnostics only.
pub fn parse_generic(reader: &mut LineReader<'_>) -> Result<Option<(u16, Blockette, ParsedUnitsPair)>> {
    let Some(blk) = Block::collect(reader, 56).or_else(|| Block::collect(reader, 46)) else {
        return Ok(None);
    };
    let seq = blk.scalar_u32("03")? as u16;
    let in_unit = parse_unit(blk.scalar_str("04")?)?;
    let out_unit = parse_unit(blk.scalar_str("05")?)?;

    let ncorners = blk.sum_u32("06")? as usize;
    let rows = blk.rows("07-08");
    if rows.len() != ncorners {
        log::warn!(
            "generic: declared {ncorners} corners across all continuation runs, found {} rows; \
             trusting the rows",
            rows.len()
        );
    }
    let mut corner_freqs = Vec::with_capacity(ncorners);
    let mut corner_slopes = Vec::with_capacity(ncorners);
    for row in &rows {
        let v = row_values(row)?;
        corner_freqs.push(
            *v.first()
                .ok_or_else(|| RespError::ArrayBoundsExceeded("generic row missing frequency".into()))?,
        );
        corner_slopes.push(
            *v.get(1)
                .ok_or_else(|| RespError::ArrayBoundsExceeded("generic row missing slope".into()))?,
        );
    }

    Ok(Some((
        seq,
        Blockette::Generic(Generic {
            corner_freqs,
            corner_slopes,
        }),
        ParsedUnitsPair { in_unit, out_unit },
    )))
}

/// B62/42 — Polynomial (nonlinear sensor response).
pub fn parse_polynomial(
    reader: &mut LineReader<'_>,
) -> Result<Option<(u16, Blockette, ParsedUnitsPair)>> {
    let Some(blk) = Block::collect(reader, 62).or_else(|| Block::collect(reader, 42)) else {
        return Ok(None);
    };
    let approximation_type = match blk.scalar_str("03")? {
        s if s.to_ascii_uppercase().starts_with("MA") => ApproximationType::MaclaurinPolynomial,
        other => {
            return Err(RespError::UnrecognizedFilterType(format!(
                "polynomial approximation type '{other}'"
            )))
        }
    };
    let in_unit = parse_unit(blk.scalar_str("04")?)?;
    // Polynomial blockettes evaluate in amplitude, not frequency; output unit
    // doesn't gate a frequency-domain unit conversion the way it does for
    // other stages, but is still recorded for continuity checks.
    let out_unit = in_unit.clone();

    let frequency_lower_bound = blk.scalar_f64("05").unwrap_or(0.0);
    let frequency_upper_bound = blk.scalar_f64("06").unwrap_or(0.0);
    let approximation_lower_bound = blk.scalar_f64("07")?;
    let approximation_upper_bound = blk.scalar_f64("08")?;
    let max_abs_error = blk.scalar_f64("09")?;

    let ncoeffs = blk.sum_u32("10")? as usize;
    let rows = blk.rows("11-12");
    if rows.len() != ncoeffs {
        log::warn!(
            "polynomial: declared {ncoeffs} coefficients across all continuation runs, found {} \
             rows; trusting the rows",
            rows.len()
        );
    }
    let mut coefficients = Vec::with_capacity(ncoeffs);
    let mut coefficient_errors = Vec::with_capacity(ncoeffs);
    for row in &rows {
        let v = row_values(row)?;
        coefficients.push(
            *v.first()
                .ok_or_else(|| RespError::ArrayBoundsExceeded("polynomial row missing coefficient".into()))?,
        );
        coefficient_errors.push(*v.get(1).unwrap_or(&0.0));
    }

    Ok(Some((
        // Polynomial blockettes don't carry a stage sequence number of their
        // own in isolation; the assembler attaches them to the stage opened
        // by the surrounding B050/B052 context.
        0,
        Blockette::Polynomial(Polynomial {
            approximation_type,
            frequency_lower_bound,
            frequency_upper_bound,
            approximation_lower_bound,
            approximation_upper_bound,
            max_abs_error,
            coefficients,
            coefficient_errors,
        }),
        ParsedUnitsPair { in_unit, out_unit },
    )))
}

/// B57/47 — Decimation.
pub fn parse_decimation(reader: &mut LineReader<'_>) -> Result<Option<(u16, Decimation)>> {
    let Some(blk) = Block::collect(reader, 57).or_else(|| Block::collect(reader, 47)) else {
        return Ok(None);
    };
    let seq = blk.scalar_u32("03")? as u16;
    let input_sample_rate = blk.scalar_f64("04")?;
    let sample_interval = if input_sample_rate != 0.0 {
        1.0 / input_sample_rate
    } else {
        0.0
    };
    let factor = blk.scalar_u32("05")?;
    let offset = blk.scalar_u32("06")?;
    let estimated_delay = blk.scalar_f64("07")?;
    let applied_correction = blk.scalar_f64("08")?;
    Ok(Some((
        seq,
        Decimation {
            sample_interval,
            factor,
            offset,
            estimated_delay,
            applied_correction,
        },
    )))
}

/// B58/48 — Gain. Calibration rows, if present, are read and discarded.
pub fn parse_gain(reader: &mut LineReader<'_>) -> Result<Option<(u16, Gain)>> {
    let Some(blk) = Block::collect(reader, 58).or_else(|| Block::collect(reader, 48)) else {
        return Ok(None);
    };
    let seq = blk.scalar_u32("03")? as u16;
    let gain = blk.scalar_f64("04")?;
    let gain_freq = blk.scalar_f64("05")?;
    Ok(Some((seq, Gain { gain, gain_freq })))
}

/// B60 — Reference. Response-lookup rows are metadata and are discarded.
pub fn parse_reference(reader: &mut LineReader<'_>) -> Result<Option<(u16, Reference)>> {
    let Some(blk) = Block::collect(reader, 60) else {
        return Ok(None);
    };
    let num_stages = blk.scalar_u32("03")?;
    let stage_num = blk.scalar_u32("04")?;
    let num_responses = blk.scalar_u32("07").unwrap_or(0);
    Ok(Some((
        stage_num as u16,
        Reference {
            num_stages,
            stage_num,
            num_responses,
        },
    )))
}

/// Input/output units carried alongside a filter blockette, used by the
/// assembler to populate the enclosing [`crate::model::Stage`].
pub struct ParsedUnitsPair {
    pub in_unit: ParsedUnit,
    pub out_unit: ParsedUnit,
}
