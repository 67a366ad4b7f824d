//! Channel assembler (spec.md §4.4): drives a [`LineReader`] across a whole
//! RESP document, grouping blockettes into [`Stage`]s by their stage
//! sequence number and handing back unvalidated [`Channel`]s.
//!
//! Ordering, unit-continuity, FIR normalization, and delay/correction
//! accumulation are deliberately *not* done here — that's [`crate::validate`]'s
//! job. The assembler's only responsibility is turning a flat line stream
//! into the shape [`crate::model::Channel`] expects, in canonical
//! `[Reference?, Filter, Decimation?, Gain]` blockette order per stage.

use std::collections::BTreeMap;

use crate::datetime::{parse_seed_datetime, parse_seed_datetime_opt};
use crate::error::{RespError, Result};
use crate::lexer::{tokenize_all, LineReader};
use crate::model::{Blockette, Channel, Decimation, Gain, Reference, Stage};
use crate::units::ParsedUnit;

use super::blockettes::{
    self, ParsedUnitsPair,
};

/// Blockette numbers (dictionary and per-channel spellings) the assembler's
/// stage loop recognizes; anything else ends the current channel.
const STAGE_BLOCKETTE_NOS: &[u16] = &[
    53, 43, 54, 44, 55, 45, 56, 46, 57, 47, 58, 48, 60, 61, 41, 62, 42,
];

#[derive(Default)]
struct StageBuilder {
    reference: Option<Reference>,
    filter: Option<Blockette>,
    units: Option<ParsedUnitsPair>,
    decimation: Option<Decimation>,
    gain: Option<Gain>,
}

impl StageBuilder {
    fn into_stage(self, sequence_no: u16) -> Stage {
        let (input_unit, output_unit) = match self.units {
            Some(u) => (u.in_unit, u.out_unit),
            None => (
                ParsedUnit::default_sentinel("-"),
                ParsedUnit::default_sentinel("-"),
            ),
        };
        let mut blockettes = Vec::new();
        if let Some(r) = self.reference {
            blockettes.push(Blockette::Reference(r));
        }
        if let Some(f) = self.filter {
            blockettes.push(f);
        }
        if let Some(d) = self.decimation {
            blockettes.push(Blockette::Decimation(d));
        }
        if let Some(g) = self.gain {
            blockettes.push(Blockette::Gain(g));
        }
        Stage {
            sequence_no,
            input_unit,
            output_unit,
            blockettes,
        }
    }
}

fn first_field(fields: &[String], context: &str) -> Result<String> {
    fields
        .first()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| RespError::UnexpectedEof(format!("{context}: field had no value")))
}

/// Parse a whole RESP document into its constituent (unvalidated) channels.
///
/// A recoverable error while assembling one channel (spec.md §4.4/§7 — every
/// kind except `UndefinedPrefix`) drops that channel with a warning and
/// resynchronizes to the next `B050` header rather than aborting the whole
/// document; `UndefinedPrefix` is fatal and aborts the file.
pub fn assemble_all(text: &str) -> Result<Vec<Channel>> {
    let lines = tokenize_all(text)?;
    let mut reader = LineReader::new(&lines);
    let mut channels = Vec::new();
    while !reader.is_at_end() {
        match reader.peek_prefix() {
            Some((50, _)) => match assemble_one(&mut reader) {
                Ok(channel) => channels.push(channel),
                Err(e @ RespError::UndefinedPrefix(_)) => return Err(e),
                Err(e) => {
                    log::warn!("dropping malformed channel, resyncing to next B050: {e}");
                    reader.skip_until(50);
                }
            },
            other => {
                return Err(RespError::IllegalRespFormat(format!(
                    "expected B050 to start a channel, found {other:?}"
                )))
            }
        }
    }
    Ok(channels)
}

fn assemble_one(reader: &mut LineReader<'_>) -> Result<Channel> {
    let station = first_field(reader.expect(50, "03")?, "B050F03 station")?;
    let network = first_field(reader.expect(50, "16")?, "B050F16 network")?;
    let location = first_field(reader.expect(52, "03")?, "B052F03 location")?;
    let channel = first_field(reader.expect(52, "04")?, "B052F04 channel")?;
    let start_time = parse_seed_datetime(&first_field(
        reader.expect(52, "22")?,
        "B052F22 start date",
    )?)?;
    let end_time = parse_seed_datetime_opt(&first_field(
        reader.expect(52, "23")?,
        "B052F23 end date",
    )?)?;

    let mut stages: BTreeMap<u16, StageBuilder> = BTreeMap::new();

    loop {
        match reader.peek_prefix() {
            Some((n, _)) if STAGE_BLOCKETTE_NOS.contains(&n) => {}
            _ => break,
        }

        if let Some((seq, blkt, units)) = blockettes::parse_poles_zeros(reader)? {
            let b = stages.entry(seq).or_default();
            b.filter = Some(blkt);
            b.units = Some(units);
            continue;
        }
        if let Some((seq, blkt, units)) = blockettes::parse_coefficients(reader)? {
            let b = stages.entry(seq).or_default();
            b.filter = Some(blkt);
            b.units = Some(units);
            continue;
        }
        if let Some((seq, blkt, units)) = blockettes::parse_fir(reader)? {
            let b = stages.entry(seq).or_default();
            b.filter = Some(blkt);
            b.units = Some(units);
            continue;
        }
        if let Some((seq, blkt, units)) = blockettes::parse_list(reader)? {
            let b = stages.entry(seq).or_default();
            b.filter = Some(blkt);
            b.units = Some(units);
            continue;
        }
        if let Some((seq, blkt, units)) = blockettes::parse_generic(reader)? {
            let b = stages.entry(seq).or_default();
            b.filter = Some(blkt);
            b.units = Some(units);
            continue;
        }
        if let Some((seq, blkt, units)) = blockettes::parse_polynomial(reader)? {
            let b = stages.entry(seq).or_default();
            b.filter = Some(blkt);
            b.units = Some(units);
            continue;
        }
        if let Some((seq, deci)) = blockettes::parse_decimation(reader)? {
            stages.entry(seq).or_default().decimation = Some(deci);
            continue;
        }
        if let Some((seq, gain)) = blockettes::parse_gain(reader)? {
            stages.entry(seq).or_default().gain = Some(gain);
            continue;
        }
        if let Some((seq, reference)) = blockettes::parse_reference(reader)? {
            stages.entry(seq).or_default().reference = Some(reference);
            continue;
        }

        // peek_prefix said this was a recognized stage blockette number but
        // none of the parsers consumed it: malformed field layout.
        let (n, f) = reader.peek_prefix().unwrap();
        return Err(RespError::ParseError(format!(
            "unrecognized field layout for blockette B{n:02}F{f}"
        )));
    }

    let reported_sensitivity = stages
        .get(&0)
        .and_then(|b| b.gain.as_ref())
        .map(|g| g.gain)
        .unwrap_or(0.0);
    let reported_sensitivity_freq = stages
        .get(&0)
        .and_then(|b| b.gain.as_ref())
        .map(|g| g.gain_freq)
        .unwrap_or(0.0);

    let stages: Vec<Stage> = stages
        .into_iter()
        .map(|(seq, builder)| builder.into_stage(seq))
        .collect();

    Ok(Channel {
        station,
        network,
        location,
        channel,
        start_time,
        end_time,
        reported_sensitivity,
        reported_sensitivity_freq,
        computed_sensitivity: 0.0,
        computed_delay: 0.0,
        estimated_delay: 0.0,
        applied_correction: 0.0,
        sample_interval: 0.0,
        stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
B050F03     Station:                               ANMO
B050F16     Network:                               IU
B052F03     Location:                              00
B052F04     Channel:                                BHZ
B052F22     Start date:                            1993,001,00:00:00.0000
B052F23     End date:                              No Ending Time
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  8.388600E+08
B058F05     Frequency of gain:                     1.000000E-01
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B057F03     Stage sequence number:                 1
B057F04     Input sample rate (HZ):                100.0
B057F05     Decimation factor:                     1
B057F06     Decimation offset:                      0
B057F07     Estimated delay (seconds):             0.0
B057F08     Correction applied (seconds):          0.0
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  2400.0
B058F05     Frequency of gain:                     0.1
";

    #[test]
    fn assembles_one_channel_two_stages() {
        let channels = assemble_all(SIMPLE).unwrap();
        assert_eq!(channels.len(), 1);
        let ch = &channels[0];
        assert_eq!(ch.station, "ANMO");
        assert_eq!(ch.network, "IU");
        assert_eq!(ch.channel, "BHZ");
        assert_eq!(ch.reported_sensitivity, 8.3886e8);
        assert_eq!(ch.stages.len(), 2);
        assert_eq!(ch.stages[0].sequence_no, 0);
        assert!(ch.stages[0].is_gain_only());
        assert_eq!(ch.stages[1].sequence_no, 1);
        assert!(ch.stages[1].filter().is_some());
        assert!(ch.stages[1].decimation().is_some());
        assert!(ch.stages[1].gain().is_some());
    }

    #[test]
    fn missing_b050_is_illegal_format() {
        assert!(assemble_all("B052F03 Location: 00\n").is_err());
    }

    #[test]
    fn malformed_channel_is_skipped_and_assembly_continues() {
        let broken = "\
B050F03     Station:                               BAD0
B050F16     Network:                               IU
B052F03     Location:                              00
B052F04     Channel:                                BHZ
B052F22     Start date:                            not-a-date
B052F23     End date:                              No Ending Time
";
        let text = format!("{broken}{SIMPLE}");
        let channels = assemble_all(&text).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].station, "ANMO");
    }
}
