//! Unit tests for TOML configuration parsing.

use l6474::config::SystemConfig;
use l6474::{AlarmMask, OcdThreshold, StepMode, Stepping, StopPolicy};

/// Test parsing a device with every section present.
#[test]
fn test_parse_device_config() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.driver]
stepping = "synchronous"
chunk_pulses = 32
disable_overcurrent_shutdown = true

[devices.x_axis.parameters]
phase_current_ma = 1500.0
ocd_threshold_ma = 2250
step_mode = "half"
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let device = config.device("x_axis").expect("Device not found");

    assert_eq!(device.name.as_str(), "x");
    assert_eq!(device.driver.stepping, Stepping::Synchronous);
    assert_eq!(device.driver.chunk_pulses, 32);
    assert!(device.driver.disable_overcurrent_shutdown);
    assert_eq!(device.driver.config_register(), 0x2E00);
    assert_eq!(device.parameters.phase_current.0, 1500.0);
    assert_eq!(device.parameters.ocd_threshold, OcdThreshold::Ma2250);
    assert_eq!(device.parameters.step_mode, StepMode::Half);
}

/// Test that omitted sections fall back to defaults.
#[test]
fn test_parse_defaults() {
    let toml_str = r#"
[devices.y_axis]
name = "y"
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let device = config.device("y_axis").expect("Device not found");

    assert_eq!(device.driver.chunk_pulses, 64);
    assert_eq!(device.driver.stop_policy, StopPolicy::Resync);
    assert_eq!(device.driver.alarm_enables, AlarmMask::ALL);
    assert_eq!(device.driver.config_register(), 0x2E80);
    assert_eq!(device.parameters.step_mode, StepMode::Micro16);

    let regs = device.parameters.encode().unwrap().value();
    assert_eq!(regs.tval, 0x26);
    assert_eq!(regs.ocd_th, 0x03);
}

/// Test several devices in one file.
#[test]
fn test_parse_multiple_devices() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.y_axis]
name = "y"

[devices.y_axis.driver]
stepping = "asynchronous"
stop_policy = "counted"
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let mut names: Vec<&str> = config.device_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["x_axis", "y_axis"]);

    let y = config.device("y_axis").unwrap();
    assert_eq!(y.driver.stepping, Stepping::Asynchronous);
    assert_eq!(y.driver.stop_policy, StopPolicy::Counted);
    assert!(config.device("z_axis").is_none());
}

/// Test that unknown enum spellings are rejected during parsing.
#[test]
fn test_invalid_step_mode_rejected() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.parameters]
step_mode = "micro32"
"#;

    let result: Result<SystemConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err(), "Should reject 1/32 microstepping");
}

/// Test that thresholds off the 375 mA grid are rejected during parsing.
#[test]
fn test_invalid_threshold_rejected() {
    let toml_str = r#"
[devices.x_axis]
name = "x"

[devices.x_axis.parameters]
ocd_threshold_ma = 400
"#;

    let result: Result<SystemConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err(), "Should reject 400 mA threshold");
}

/// Test loading from a file on disk.
#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join(format!("l6474-config-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        r#"
[devices.x_axis]
name = "x"
"#,
    )
    .unwrap();

    let config = l6474::load_config(&path);
    std::fs::remove_file(&path).unwrap();

    assert!(config.unwrap().device("x_axis").is_some());
}

/// Test that a missing file surfaces as a configuration error.
#[test]
fn test_load_missing_file() {
    let result = l6474::load_config("/nonexistent/l6474.toml");
    assert!(matches!(
        result,
        Err(l6474::Error::Config(l6474::error::ConfigError::IoError(_)))
    ));
}
