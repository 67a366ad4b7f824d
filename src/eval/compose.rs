//! Stage-product composition (spec.md §4.7): multiplies each included
//! stage's filter/decimation/gain contributions across frequency, applies
//! the optional total-sensitivity substitution, and converts to the
//! requested output unit.

use std::f64::consts::PI;

use crate::config::RequestConfig;
use crate::error::{RespError, Result};
use crate::interpolate;
use crate::model::{Blockette, Channel, Cplx, Response, Stage};
use crate::units::Unit;

use super::stage::{decimation_phase_factor, evaluate_filter, gain_factor, stage_sample_interval};

/// Compose `channel`'s response at `freqs`, honoring `config`'s stage-range
/// restriction, delay-term choice, sensitivity substitution, and output unit.
///
/// A List-blockette stage (guaranteed by the validator to be the channel's
/// only filter-bearing stage, spec.md §4.5 step 9) drops out-of-range
/// requested frequencies from the whole batch up front — `Response.freqs`
/// may therefore be shorter than `freqs` — and fails the whole call with
/// [`RespError::ImproperDataType`] if none of `freqs` falls inside its table
/// (spec.md §4.7).
pub fn compute_response(channel: &Channel, freqs: &[f64], config: &RequestConfig) -> Result<Response> {
    let stages = selected_stages(channel, config)?;
    let native_unit = stages
        .first()
        .map(|s| s.input_unit.unit)
        .unwrap_or(Unit::Default);

    let sensitivity_scale = if config.use_total_sensitivity && channel.computed_sensitivity != 0.0 {
        channel.reported_sensitivity / channel.computed_sensitivity
    } else {
        1.0
    };

    let freqs_to_use: Vec<f64> = match stages.iter().find_map(|s| match s.filter() {
        Some(Blockette::List(list)) => Some(list),
        _ => None,
    }) {
        Some(list) => {
            let (retained, _, _) = interpolate::interpolate(list, freqs, config.tension)?;
            retained
        }
        None => freqs.to_vec(),
    };

    let mut values = Vec::with_capacity(freqs_to_use.len());
    for &f in &freqs_to_use {
        let mut product = Cplx::new(1.0, 0.0);
        for stage in &stages {
            product *= evaluate_stage(stage, f, config);
        }
        product *= sensitivity_scale;
        product *= unit_conversion_factor(native_unit, config.output_unit, f)?;
        values.push(product);
    }

    Ok(Response {
        network: channel.network.clone(),
        station: channel.station.clone(),
        location: channel.location.clone(),
        channel: channel.channel.clone(),
        freqs: freqs_to_use,
        values,
    })
}

fn selected_stages<'a>(channel: &'a Channel, config: &RequestConfig) -> Result<Vec<&'a Stage>> {
    let stages: Vec<&Stage> = channel
        .physical_stages()
        .filter(|s| {
            config.start_stage.map(|lo| s.sequence_no >= lo).unwrap_or(true)
                && config.stop_stage.map(|hi| s.sequence_no <= hi).unwrap_or(true)
        })
        .collect();
    if stages.is_empty() {
        return Err(RespError::NoStageMatched);
    }
    Ok(stages)
}

fn evaluate_stage(stage: &Stage, freq_hz: f64, config: &RequestConfig) -> Cplx {
    let sample_interval = stage_sample_interval(stage);
    let mut product = Cplx::new(1.0, 0.0);
    if let Some(filter) = stage.filter() {
        product *= evaluate_filter(
            filter,
            freq_hz,
            sample_interval,
            config.tension,
            config.poly_eval_point,
        );
    }
    if let Some(d) = stage.decimation() {
        product *= decimation_phase_factor(d, freq_hz, config.use_estimated_delay);
    }
    if let Some(g) = stage.gain() {
        product *= gain_factor(g);
    }
    product
}

fn motion_order(u: Unit) -> Option<i32> {
    match u {
        Unit::Displacement => Some(0),
        Unit::Velocity => Some(1),
        Unit::Acceleration => Some(2),
        _ => None,
    }
}

/// Converts a native ground-motion unit to the requested one via `jω`
/// differentiation/integration; Pressure/Tesla/Centigrade channels only
/// admit Velocity or Default as the requested output (spec.md §4.7).
fn unit_conversion_factor(native: Unit, requested: Unit, freq_hz: f64) -> Result<Cplx> {
    if requested == Unit::Default || requested == native {
        return Ok(Cplx::new(1.0, 0.0));
    }

    if let (Some(k1), Some(k2)) = (motion_order(native), motion_order(requested)) {
        let diff = k2 - k1;
        if diff == 0 {
            return Ok(Cplx::new(1.0, 0.0));
        }
        let omega = 2.0 * PI * freq_hz;
        if omega == 0.0 {
            log::warn!(
                "unit conversion between {native:?} and {requested:?} requires \
                 a nonzero frequency; leaving 0 Hz unconverted"
            );
            return Ok(Cplx::new(1.0, 0.0));
        }
        let jw = Cplx::new(0.0, omega);
        return Ok(if diff > 0 {
            jw.powi(diff)
        } else {
            Cplx::new(1.0, 0.0) / jw.powi(-diff)
        });
    }

    if matches!(native, Unit::Pressure | Unit::Tesla | Unit::Centigrade) && requested == Unit::Velocity
    {
        return Ok(Cplx::new(1.0, 0.0));
    }

    Err(RespError::BadOutUnits(format!(
        "cannot convert {native:?} to {requested:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::assembler::assemble_all;
    use crate::validate::validate_channel;

    const CHANNEL: &str = "\
B050F03     Station:                               ANMO
B050F16     Network:                               IU
B052F03     Location:                              00
B052F04     Channel:                                BHZ
B052F22     Start date:                            1993,001,00:00:00.0000
B052F23     End date:                              No Ending Time
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  2400.0
B058F05     Frequency of gain:                     0.1
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  2400.0
B058F05     Frequency of gain:                     0.1
";

    fn build_channel() -> Channel {
        let mut channels = assemble_all(CHANNEL).unwrap();
        validate_channel(&mut channels[0]).unwrap();
        channels.remove(0)
    }

    #[test]
    fn composes_single_stage_response() {
        let channel = build_channel();
        let cfg = RequestConfig::default();
        let resp = compute_response(&channel, &[1.0, 10.0], &cfg).unwrap();
        assert!((resp.values[0] - Cplx::new(2400.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn stage_range_restriction_can_exhaust_to_no_stage_matched() {
        let channel = build_channel();
        let cfg = RequestConfig::builder().start_stage(5).build();
        let err = compute_response(&channel, &[1.0], &cfg).unwrap_err();
        assert!(matches!(err, RespError::NoStageMatched));
    }

    #[test]
    fn total_sensitivity_substitution_rescales_output() {
        let mut channel = build_channel();
        channel.reported_sensitivity = 4800.0;
        let cfg = RequestConfig::builder().use_total_sensitivity(true).build();
        let resp = compute_response(&channel, &[1.0], &cfg).unwrap();
        assert!((resp.values[0].norm() - 4800.0).abs() < 1e-3);
    }

    #[test]
    fn velocity_to_acceleration_multiplies_by_jw() {
        let channel = build_channel();
        let cfg = RequestConfig::builder()
            .output_unit(Unit::Acceleration)
            .build();
        let freq = 2.0;
        let base = compute_response(&channel, &[freq], &RequestConfig::default()).unwrap();
        let converted = compute_response(&channel, &[freq], &cfg).unwrap();
        let omega = 2.0 * PI * freq;
        let expected = base.values[0] * Cplx::new(0.0, omega);
        assert!((converted.values[0] - expected).norm() < 1e-6);
    }
}
