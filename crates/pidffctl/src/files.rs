//! Capability table and effect file loading.
//!
//! Files ending in `.json` are read as JSON, everything else as YAML.

use std::fs;
use std::path::Path;

use pidff_common::caps::DeviceCapabilities;
use pidff_common::params::{EffectKind, ParameterDelta};
use serde::Deserialize;

use crate::error::CliError;

/// An effect description: its kind and initial parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectFile {
    pub kind: EffectKind,
    #[serde(default)]
    pub parameters: ParameterDelta,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn load_capabilities(path: &Path) -> Result<DeviceCapabilities, CliError> {
    let text = fs::read_to_string(path)?;
    let parsed = if is_json(path) {
        DeviceCapabilities::from_json(&text)
    } else {
        DeviceCapabilities::from_yaml(&text)
    };
    parsed.map_err(|e| CliError::InvalidCapabilities {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

pub fn load_effect(path: &Path) -> Result<EffectFile, CliError> {
    let text = fs::read_to_string(path)?;
    let invalid = |message: String| CliError::InvalidEffect {
        path: path.display().to_string(),
        message,
    };
    if is_json(path) {
        serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))
    } else {
        serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))
    }
}

/// Parse hex bytes. Accepts `02 12 02`, `021202`, `0x02,0x12` and `02:12`.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, CliError> {
    let digits: Vec<char> = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .filter(|token| !token.is_empty())
        .flat_map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
                .chars()
                .collect::<Vec<_>>()
        })
        .collect();

    if digits.is_empty() {
        return Err(CliError::InvalidReport("no bytes given".to_string()));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::InvalidReport(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16)
                .map_err(|e| CliError::InvalidReport(format!("'{byte}' is not a hex byte: {e}")))
        })
        .collect()
}
