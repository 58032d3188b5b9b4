//! Unit test harness for l6474.
//!
//! Configuration parsing, validation and register codec properties.

mod codec_properties;
mod config_parsing;
mod config_validation;
