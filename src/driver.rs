//! Response driver and output-line formatters (spec.md §4.9, §6).
//!
//! Selects channels matching a network/station/location/channel pattern and
//! an optional evaluation time, composes each one's response, and formats it
//! as text. Writing that text to a file is left to the caller — this module
//! only ever returns `String`s.

use chrono::{DateTime, Utc};

use crate::config::RequestConfig;
use crate::error::Result;
use crate::eval::compose::compute_response;
use crate::model::{Channel, Cplx, Response};

/// Network/station/location/channel selector, supporting `*` (any run of
/// characters) and `?` (any single character) wildcards, as SEED codes do.
#[derive(Debug, Clone, PartialEq)]
pub struct SnclPattern {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl SnclPattern {
    fn matches_channel(&self, ch: &Channel) -> bool {
        glob_match(&self.network, &ch.network)
            && glob_match(&self.station, &ch.station)
            && glob_match(&self.location, &ch.location)
            && glob_match(&self.channel, &ch.channel)
    }
}

/// Simple `*`/`?` glob match, case-sensitive (SEED codes are upper-case).
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let mut dp = vec![vec![false; t.len() + 1]; p.len() + 1];
    dp[0][0] = true;
    for i in 1..=p.len() {
        if p[i - 1] == '*' {
            dp[i][0] = dp[i - 1][0];
        }
    }
    for i in 1..=p.len() {
        for j in 1..=t.len() {
            dp[i][j] = match p[i - 1] {
                '*' => dp[i - 1][j] || dp[i][j - 1],
                '?' => dp[i - 1][j - 1],
                c => dp[i - 1][j - 1] && c == t[j - 1],
            };
        }
    }
    dp[p.len()][t.len()]
}

/// Select channels matching `pattern` and, if given, valid at `at_time`.
pub fn select_channels<'a>(
    channels: &'a [Channel],
    pattern: &SnclPattern,
    at_time: Option<DateTime<Utc>>,
) -> Vec<&'a Channel> {
    channels
        .iter()
        .filter(|ch| pattern.matches_channel(ch))
        .filter(|ch| match at_time {
            None => true,
            Some(t) => ch.start_time <= t && ch.end_time.map(|e| t <= e).unwrap_or(true),
        })
        .collect()
}

/// The four textual output shapes spec.md §6 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// frequency, real part, imaginary part
    Spectra,
    /// frequency, amplitude
    Amplitude,
    /// frequency, phase (degrees)
    Phase,
    /// frequency, amplitude, phase
    Fap,
}

/// Run the full driver: select, compose, and format every matching channel.
///
/// A single channel's `compute_response` failure (most notably
/// `RespError::NoStageMatched`, when a stage-range restriction excludes all
/// of that channel's stages) is spec.md §7's "empty response, warning" case:
/// it's logged and that channel contributes nothing to `out`, rather than
/// aborting the whole batch.
pub fn run(
    channels: &[Channel],
    pattern: &SnclPattern,
    freqs: &[f64],
    config: &RequestConfig,
    at_time: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> Result<String> {
    let mut out = String::new();
    for channel in select_channels(channels, pattern, at_time) {
        let response = match compute_response(channel, freqs, config) {
            Ok(r) => r,
            Err(e) => {
                log::warn!(
                    "channel {}.{}.{}.{}: empty response, {e}",
                    channel.network,
                    channel.station,
                    channel.location,
                    channel.channel
                );
                continue;
            }
        };
        out.push_str(&header_line(channel));
        out.push('\n');
        out.push_str(&format_response(&response, format));
    }
    Ok(out)
}

fn header_line(ch: &Channel) -> String {
    format!(
        "# {}.{}.{}.{}  {}  {}",
        ch.network,
        ch.station,
        ch.location,
        ch.channel,
        ch.start_time.to_rfc3339(),
        ch.end_time.map(|t| t.to_rfc3339()).unwrap_or_else(|| "No Ending Time".into()),
    )
}

/// Format a computed [`Response`] as two- or three-column data lines,
/// scientific notation, two spaces between columns, `\n` line endings.
pub fn format_response(resp: &Response, format: OutputFormat) -> String {
    let mut out = String::with_capacity(resp.freqs.len() * 32);
    for (i, &f) in resp.freqs.iter().enumerate() {
        let v = resp.values[i];
        let line = match format {
            OutputFormat::Spectra => format_spectra_line(f, v),
            OutputFormat::Amplitude => format_amp_line(f, v),
            OutputFormat::Phase => format_phase_line(f, v),
            OutputFormat::Fap => format_fap_line(f, v),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// One `SPECTRA`-format line: frequency, real part, imaginary part.
pub fn format_spectra_line(freq: f64, value: Cplx) -> String {
    format!("{}  {}  {}", scientific(freq), scientific(value.re), scientific(value.im))
}

/// One `AMP`-format line: frequency, amplitude.
pub fn format_amp_line(freq: f64, value: Cplx) -> String {
    format!("{}  {}", scientific(freq), scientific(value.norm()))
}

/// One `PHASE`-format line: frequency, phase in degrees.
pub fn format_phase_line(freq: f64, value: Cplx) -> String {
    format!("{}  {}", scientific(freq), scientific(value.arg().to_degrees()))
}

/// One `FAP`-format line: frequency, amplitude, phase in degrees.
pub fn format_fap_line(freq: f64, value: Cplx) -> String {
    format!(
        "{}  {}  {}",
        scientific(freq),
        scientific(value.norm()),
        scientific(value.arg().to_degrees())
    )
}

/// `%.6E`-style scientific notation (`1.234560E+02`), since Rust's built-in
/// `UpperExp` doesn't zero-pad or sign the exponent the way C's `printf` does.
fn scientific(v: f64) -> String {
    if v == 0.0 {
        return "0.000000E+00".to_string();
    }
    let sign = if v.is_sign_negative() { "-" } else { "" };
    let abs = v.abs();
    let mut exp = abs.log10().floor() as i32;
    let mut mantissa = abs / 10f64.powi(exp);
    // Rounding can carry the mantissa up to 10.0; renormalize.
    if mantissa >= 9.9999995 {
        mantissa /= 10.0;
        exp += 1;
    }
    let exp_sign = if exp >= 0 { "+" } else { "-" };
    format!("{sign}{mantissa:.6}E{exp_sign}{:02}", exp.abs())
}
