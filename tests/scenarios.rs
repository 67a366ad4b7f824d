//! End-to-end scenario tests mirroring the six documented request/response
//! walkthroughs: a minimal RESP fixture goes in, a composed response or a
//! specific error comes out.

use std::f64::consts::PI;

use resp_engine::config::RequestConfig;
use resp_engine::driver::{self, OutputFormat, SnclPattern};
use resp_engine::error::RespError;
use resp_engine::model::{Channel, Cplx};
use resp_engine::parser::assembler::assemble_all;
use resp_engine::units::Unit;
use resp_engine::validate::validate_channel;

fn build_channel(text: &str) -> Channel {
    let mut channels = assemble_all(text).unwrap();
    validate_channel(&mut channels[0]).unwrap();
    channels.remove(0)
}

const HEADER: &str = "\
B050F03     Station:                               ANMO
B050F16     Network:                               IU
B052F03     Location:                              00
B052F04     Channel:                                BHZ
B052F22     Start date:                            1993,001,00:00:00.0000
B052F23     End date:                              No Ending Time
";

#[test]
fn analog_pole_zero_only() {
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  2.0
B058F05     Frequency of gain:                     0.1
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                1
B053F15-18      0 -1.000000E+00  0.000000E+00  0.000000E+00  0.000000E+00
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  2.0
B058F05     Frequency of gain:                     0.1
"
    );
    let channel = build_channel(&text);
    let cfg = RequestConfig::default();

    let at_dc = resp_engine::eval::compose::compute_response(&channel, &[0.0], &cfg).unwrap();
    assert!((at_dc.values[0] - Cplx::new(2.0, 0.0)).norm() < 1e-9);

    let freq = 1.0 / (2.0 * PI);
    let at_one = resp_engine::eval::compose::compute_response(&channel, &[freq], &cfg).unwrap();
    let expected = Cplx::new(1.0, -1.0);
    assert!((at_one.values[0] - expected).norm() < 1e-9);
}

#[test]
fn fir_identity() {
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
B061F03     Stage sequence number:                 1
B061F04     Symmetry code:                         B
B061F05     Response in units lookup:              COUNTS
B061F06     Response out units lookup:             COUNTS
B061F07     Number of numerators:                  1
B061F08-09       0  1.000000E+00  0.000000E+00
B057F03     Stage sequence number:                 1
B057F04     Input sample rate (HZ):                100.0
B057F05     Decimation factor:                     1
B057F06     Decimation offset:                     0
B057F07     Estimated delay (seconds):             0.0000
B057F08     Correction applied (seconds):          0.0000
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
"
    );
    let channel = build_channel(&text);
    let cfg = RequestConfig::default();
    for freq in [0.0, 1.0, 10.0, 49.9] {
        let resp = resp_engine::eval::compose::compute_response(&channel, &[freq], &cfg).unwrap();
        assert!(
            (resp.values[0] - Cplx::new(1.0, 0.0)).norm() < 1e-9,
            "H({freq}) should be unity, got {:?}",
            resp.values[0]
        );
    }
}

#[test]
fn unit_continuity_failure_rejects_the_channel() {
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             M/S
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 2
B053F05     Response in units lookup:              M
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B058F03     Stage sequence number:                 2
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
"
    );
    let mut channels = assemble_all(&text).unwrap();
    let err = validate_channel(&mut channels[0]).unwrap_err();
    assert!(matches!(err, RespError::IllegalRespFormat(_)));
}

#[test]
fn velocity_to_acceleration_scales_by_two_pi() {
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               1.0
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
"
    );
    let channel = build_channel(&text);
    let raw = resp_engine::eval::compose::compute_response(&channel, &[1.0], &RequestConfig::default())
        .unwrap();
    let cfg = RequestConfig::builder().output_unit(Unit::Acceleration).build();
    let converted = resp_engine::eval::compose::compute_response(&channel, &[1.0], &cfg).unwrap();
    let ratio = converted.values[0].norm() / raw.values[0].norm();
    assert!((ratio - 2.0 * PI).abs() < 1e-9);
}

#[test]
fn list_interpolation_drops_out_of_range_requests() {
    let _ = env_logger::try_init();
    let mut rows = String::new();
    let points = [(0.1, 1.0, 0.0), (1.0, 2.0, 10.0), (10.0, 3.0, 20.0)];
    for (i, (f, a, p)) in points.iter().enumerate() {
        rows.push_str(&format!(
            "B055F07-10      {i}  {f:.6E}  {a:.6E}  0.000000E+00  {p:.6E}  0.000000E+00\n"
        ));
    }
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
B055F03     Stage sequence number:                 1
B055F04     Response in units lookup:              M/S
B055F05     Response out units lookup:             V
B055F06     Number of responses listed:            3
{rows}\
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
"
    );
    let channel = build_channel(&text);
    let cfg = RequestConfig::default();
    // 5 requested, 2 outside [0.1, 10.0] Hz -> 3 retained (spec.md §8 scenario 5).
    let freqs = [0.05, 0.1, 1.0, 10.0, 20.0];
    let resp = resp_engine::eval::compose::compute_response(&channel, &freqs, &cfg).unwrap();
    assert_eq!(resp.freqs, vec![0.1, 1.0, 10.0]);
    assert_eq!(resp.values.len(), 3);
    assert!((resp.values[0].norm() - 1.0).abs() < 1e-6);
    assert!((resp.values[2].norm() - 3.0).abs() < 1e-6);
}

#[test]
fn list_interpolation_fails_when_all_requests_are_out_of_range() {
    let mut rows = String::new();
    let points = [(0.1, 1.0, 0.0), (1.0, 2.0, 10.0), (10.0, 3.0, 20.0)];
    for (i, (f, a, p)) in points.iter().enumerate() {
        rows.push_str(&format!(
            "B055F07-10      {i}  {f:.6E}  {a:.6E}  0.000000E+00  {p:.6E}  0.000000E+00\n"
        ));
    }
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
B055F03     Stage sequence number:                 1
B055F04     Response in units lookup:              M/S
B055F05     Response out units lookup:             V
B055F06     Number of responses listed:            3
{rows}\
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
"
    );
    let channel = build_channel(&text);
    let cfg = RequestConfig::default();
    let err =
        resp_engine::eval::compose::compute_response(&channel, &[50.0, 100.0], &cfg).unwrap_err();
    assert!(matches!(err, RespError::ImproperDataType(_)));
}

#[test]
fn continuation_merge_produces_one_fifty_tap_fir() {
    // Coefficients are deliberately non-palindromic (monotonically increasing)
    // so this test exercises only continuation-line merging, not the
    // separate Asym-palindrome-upgrade path covered in validate.rs's tests.
    let mut rows = String::new();
    for i in 0..20 {
        rows.push_str(&format!(
            "B061F08-09      {i}  {:.6E}  0.000000E+00\n",
            0.01 + i as f64 * 1.0e-4
        ));
    }
    rows.push_str(
        "B061F03     Stage sequence number:                 1\n\
B061F04     Symmetry code:                         A\n\
B061F05     Response in units lookup:              COUNTS\n\
B061F06     Response out units lookup:             COUNTS\n\
B061F07     Number of numerators:                  30\n",
    );
    for i in 20..50 {
        rows.push_str(&format!(
            "B061F08-09      {i}  {:.6E}  0.000000E+00\n",
            0.01 + i as f64 * 1.0e-4
        ));
    }
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
B061F03     Stage sequence number:                 1
B061F04     Symmetry code:                         A
B061F05     Response in units lookup:              COUNTS
B061F06     Response out units lookup:             COUNTS
B061F07     Number of numerators:                  20
{rows}\
B057F03     Stage sequence number:                 1
B057F04     Input sample rate (HZ):                100.0
B057F05     Decimation factor:                     1
B057F06     Decimation offset:                     0
B057F07     Estimated delay (seconds):             0.0000
B057F08     Correction applied (seconds):          0.0000
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  1.0
B058F05     Frequency of gain:                     1.0
"
    );
    let mut channels = assemble_all(&text).unwrap();
    validate_channel(&mut channels[0]).unwrap();
    let stage = channels[0]
        .stages
        .iter()
        .find(|s| s.sequence_no == 1)
        .expect("stage 1 present");
    match stage.filter().expect("stage 1 has a filter") {
        resp_engine::model::Blockette::Fir(fir) => assert_eq!(fir.coeffs.len(), 50),
        other => panic!("expected a merged Fir, got {other:?}"),
    }
}

#[test]
fn driver_selects_by_sncl_and_formats_fap() {
    let text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  10.0
B058F05     Frequency of gain:                     1.0
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  10.0
B058F05     Frequency of gain:                     1.0
"
    );
    let channels = vec![build_channel(&text)];
    let pattern = SnclPattern {
        network: "IU".into(),
        station: "AN??".into(),
        location: "00".into(),
        channel: "BHZ".into(),
    };
    let out = driver::run(
        &channels,
        &pattern,
        &[1.0],
        &RequestConfig::default(),
        None,
        OutputFormat::Fap,
    )
    .unwrap();
    assert!(out.contains("IU.ANMO.00.BHZ"));
    assert_eq!(out.lines().filter(|l| !l.starts_with('#')).count(), 1);
}

#[test]
fn driver_isolates_a_single_channels_compute_response_failure() {
    let _ = env_logger::try_init();
    // BAD0's only physical stage is sequence 1; ANMO's is sequence 2.
    // Restricting the request to stage 2 exhausts BAD0's stage set down to
    // nothing (`RespError::NoStageMatched`) while leaving ANMO composable.
    let bad_text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  10.0
B058F05     Frequency of gain:                     1.0
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B058F03     Stage sequence number:                 1
B058F04     Gain:                                  10.0
B058F05     Frequency of gain:                     1.0
"
    );
    let bad_text = bad_text.replace("ANMO", "BAD0").replace("BHZ", "BHN");
    let bad = build_channel(&bad_text);

    let good_text = format!(
        "{HEADER}\
B058F03     Stage sequence number:                 0
B058F04     Gain:                                  10.0
B058F05     Frequency of gain:                     1.0
B053F03     Transfer function type:                A
B053F04     Stage sequence number:                 2
B053F05     Response in units lookup:              M/S
B053F06     Response out units lookup:             V
B053F07     A0 normalization factor:                1.0
B053F08     Normalization frequency:               0.1
B053F09     Number of complex zeros:                0
B053F14     Number of complex poles:                0
B058F03     Stage sequence number:                 2
B058F04     Gain:                                  10.0
B058F05     Frequency of gain:                     1.0
"
    );
    let good = build_channel(&good_text);

    let channels = vec![bad, good];
    let pattern = SnclPattern {
        network: "IU".into(),
        station: "*".into(),
        location: "00".into(),
        channel: "*".into(),
    };
    let cfg = RequestConfig::builder().start_stage(2).build();
    let out = driver::run(&channels, &pattern, &[1.0], &cfg, None, OutputFormat::Amplitude).unwrap();
    assert!(!out.contains("IU.BAD0.00.BHN"));
    assert!(out.contains("IU.ANMO.00.BHZ"));
}
