//! Unit tests for configuration validation.

use l6474::config::{validate_config, SystemConfig};
use l6474::error::{ConfigError, Error, ParamError};

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.parameters]
phase_current_ma = 800.0
ocd_threshold_ma = 1125
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    assert!(validate_config(&config).is_ok());
}

/// Test validation fails for a zero chunk size.
#[test]
fn test_zero_chunk_size_rejected() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.driver]
chunk_pulses = 0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let result = validate_config(&config);

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidChunkSize(0)))
    ));
}

/// Test validation fails for a negative timing value.
#[test]
fn test_negative_time_rejected() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.parameters]
on_time_us = -1.0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    match validate_config(&config) {
        Err(Error::Config(ConfigError::InvalidParameter { device, error })) => {
            assert_eq!(device.as_str(), "x_axis");
            assert_eq!(error, ParamError::NotFinite("on_time"));
        }
        other => panic!("expected InvalidParameter, got {:?}", other),
    }
}

/// Test that saturating values are accepted (clamped at encode time).
#[test]
fn test_saturating_values_accepted() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.parameters]
phase_current_ma = 9000.0
off_time_us = 200.0

[devices.x_axis.parameters.fast_decay]
off_time_us = 100.0
step_time_us = 0.0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    assert!(validate_config(&config).is_ok());

    let encoded = config.device("x_axis").unwrap().parameters.encode().unwrap();
    assert!(encoded.is_clamped());
    assert_eq!(encoded.value().tval, 0x7F);
    assert_eq!(encoded.value().toff_min, 0x7F);
    assert_eq!(encoded.value().t_fast, 0xF0);
}

/// Test that parse_config runs validation.
#[test]
fn test_parse_config_validates() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.driver]
chunk_pulses = 0
"#;

    assert!(matches!(
        l6474::parse_config(toml_str),
        Err(Error::Config(ConfigError::InvalidChunkSize(0)))
    ));
}
