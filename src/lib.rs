//! Pure Rust seismic instrument-response engine: parses RESP-format channel
//! responses, validates and normalizes them, evaluates per-stage transfer
//! functions, and composes the result into a sampled complex response.
//!
//! # Quick Start
//!
//! ```no_run
//! use resp_engine::{config::RequestConfig, driver, parser::assembler};
//!
//! let text = std::fs::read_to_string("RESP.IU.ANMO..BHZ").unwrap();
//! let mut channels = assembler::assemble_all(&text).unwrap();
//! for ch in &mut channels {
//!     resp_engine::validate::validate_channel(ch).unwrap();
//! }
//!
//! let pattern = driver::SnclPattern {
//!     network: "IU".into(),
//!     station: "ANMO".into(),
//!     location: "00".into(),
//!     channel: "BHZ".into(),
//! };
//! let freqs: Vec<f64> = (1..=10).map(|i| i as f64 * 0.1).collect();
//! let config = RequestConfig::default();
//! let text = driver::run(&channels, &pattern, &freqs, &config, None, driver::OutputFormat::Fap).unwrap();
//! println!("{text}");
//! ```

pub(crate) mod datetime;
pub mod config;
pub mod error;
pub mod eval;
pub mod driver;
pub mod interpolate;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod units;
pub mod validate;

pub use config::RequestConfig;
pub use error::{RespError, Result};
pub use model::{Blockette, Channel, Response, Stage};
