//! Fleet configuration types and the joint configuration registry.
//!
//! This module contains:
//! - `FleetConfig` - main configuration loaded from `fleet.toml`
//! - `JointDescriptor` - one joint as written in the file (string parameters)
//! - `JointSpec` - validated, immutable per-joint configuration
//! - `parse_joint_specs` - registry turning descriptors into specs

use crate::config::SharedConfig;
use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_JOINTS};
use crate::hal::driver::HalError;
use crate::hal::types::ControlMode;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Default function for cycle_time_us
fn default_cycle_time_us() -> u32 {
    DEFAULT_CYCLE_TIME_US
}

/// Default function for the SDK backend name
fn default_sdk() -> String {
    "simulation".to_string()
}

/// Main configuration loaded from `fleet.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Logging and service identity.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Control cycle time in microseconds.
    /// Defaults to DEFAULT_CYCLE_TIME_US (1000μs) if omitted.
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Name of the SDK backend to use (e.g. "simulation").
    #[serde(default = "default_sdk")]
    pub sdk: String,

    /// Joint descriptors in logical joint order.
    #[serde(default)]
    pub joints: Vec<JointDescriptor>,
}

impl FleetConfig {
    /// Validate the fleet-level fields.
    ///
    /// Per-joint parameters are validated by [`parse_joint_specs`] at
    /// configure time, not here.
    pub fn validate(&self) -> Result<(), HalError> {
        self.shared
            .validate()
            .map_err(|e| HalError::ConfigError(e.to_string()))?;

        if self.cycle_time_us == 0 {
            return Err(HalError::ConfigError(
                "cycle_time_us must be greater than 0".to_string(),
            ));
        }

        if self.joints.len() > MAX_JOINTS {
            return Err(HalError::ConfigError(format!(
                "Too many joints: {} (max {})",
                self.joints.len(),
                MAX_JOINTS
            )));
        }

        if self.sdk.is_empty() {
            return Err(HalError::ConfigError("sdk cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            cycle_time_us: DEFAULT_CYCLE_TIME_US,
            sdk: default_sdk(),
            joints: Vec::new(),
        }
    }
}

/// One joint as provided by the host: a name plus string parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointDescriptor {
    /// Joint name (unique identifier, prefix of its interface names)
    pub name: String,

    /// String-keyed parameters. Scalar TOML values are stringified.
    #[serde(default, deserialize_with = "deserialize_params")]
    pub parameters: BTreeMap<String, String>,
}

impl JointDescriptor {
    /// Create a descriptor from `(key, value)` pairs.
    pub fn new<I, K, V>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(|v| v.trim())
    }
}

fn deserialize_params<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, toml::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(D::Error::custom(format!(
                        "parameter '{key}' must be a scalar, got {}",
                        other.type_str()
                    )));
                }
            };
            Ok((key, text))
        })
        .collect()
}

/// Homing policy applied during activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HomingPolicy {
    /// Never home.
    #[default]
    Skip = 0,
    /// Home only if the node reports it has not been homed.
    HomeIfNotHomed = 1,
    /// Home on every activation.
    AlwaysHome = 2,
}

impl HomingPolicy {
    /// Policy for its numeric parameter value.
    #[inline]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Skip),
            1 => Some(Self::HomeIfNotHomed),
            2 => Some(Self::AlwaysHome),
            _ => None,
        }
    }
}

/// Validated static configuration of one joint. Immutable after configure.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    /// Joint name
    pub name: String,
    /// Logical joint index (position in the descriptor list)
    pub index: usize,
    /// Port identifier (transport path)
    pub port: String,
    /// Node index within the port chain
    pub node: usize,
    /// Velocity limit [user units / s]
    pub vel_limit: f64,
    /// Acceleration limit [user units / s²]
    pub acc_limit: f64,
    /// Homing policy
    pub homing: HomingPolicy,
    /// Linear travel per motor revolution; `None` for rotary joints
    pub feed_constant: Option<f64>,
    /// Peak torque rating; `None` when no effort reading is wanted
    pub peak_torque: Option<f64>,
    /// Monitored only, never actuated
    pub read_only: bool,
    /// Control mode in effect right after configure
    pub initial_mode: ControlMode,
}

const REQUIRED_KEYS: [&str; 5] = ["port", "node", "vel_limit", "acc_limit", "homing"];

impl JointSpec {
    /// Validate one descriptor.
    ///
    /// # Errors
    /// - `MissingParameters` if any of `port`, `node`, `vel_limit`,
    ///   `acc_limit`, `homing` is absent
    /// - `InvalidHoming` if `homing` is not 0, 1 or 2
    /// - `InvalidParameter` if a present value cannot be parsed
    pub fn from_descriptor(index: usize, desc: &JointDescriptor) -> Result<Self, HalError> {
        if desc.name.is_empty() {
            return Err(HalError::ConfigError(format!("Joint {} has empty name", index)));
        }
        if REQUIRED_KEYS.iter().any(|key| desc.param(key).is_none()) {
            return Err(HalError::MissingParameters {
                joint: desc.name.clone(),
            });
        }

        let port = desc.param("port").unwrap_or_default().to_string();
        let node = parse_value::<usize>(desc, "node")?;
        let vel_limit = parse_finite(desc, "vel_limit")?;
        let acc_limit = parse_finite(desc, "acc_limit")?;

        let raw_homing = desc.param("homing").unwrap_or_default();
        let homing = raw_homing
            .parse::<i64>()
            .ok()
            .and_then(HomingPolicy::from_i64)
            .ok_or_else(|| HalError::InvalidHoming {
                joint: desc.name.clone(),
                value: raw_homing.to_string(),
            })?;

        let feed_constant = parse_positive(desc, "feed_constant")?;
        let peak_torque = parse_positive(desc, "peak_torque")?;
        let read_only = parse_flag(desc, "read_only")?;

        let initial_mode = match desc.param("initial_mode") {
            None => ControlMode::Undefined,
            Some(raw) => ControlMode::from_param(raw).ok_or_else(|| invalid(desc, "initial_mode", raw))?,
        };

        Ok(Self {
            name: desc.name.clone(),
            index,
            port,
            node,
            vel_limit,
            acc_limit,
            homing,
            feed_constant,
            peak_torque,
            read_only,
            initial_mode,
        })
    }
}

/// Validate every descriptor and produce one `JointSpec` per joint.
///
/// Fails on the first invalid joint; no partial result is returned.
pub fn parse_joint_specs(descriptors: &[JointDescriptor]) -> Result<Vec<JointSpec>, HalError> {
    if descriptors.len() > MAX_JOINTS {
        return Err(HalError::ConfigError(format!(
            "Too many joints: {} (max {})",
            descriptors.len(),
            MAX_JOINTS
        )));
    }

    let mut names = HashSet::new();
    let mut specs = Vec::with_capacity(descriptors.len());
    for (index, desc) in descriptors.iter().enumerate() {
        let spec = JointSpec::from_descriptor(index, desc)?;
        if !names.insert(spec.name.clone()) {
            return Err(HalError::ConfigError(format!(
                "Duplicate joint name: {}",
                spec.name
            )));
        }
        specs.push(spec);
    }
    Ok(specs)
}

fn invalid(desc: &JointDescriptor, key: &'static str, raw: &str) -> HalError {
    HalError::InvalidParameter {
        joint: desc.name.clone(),
        key,
        value: raw.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(desc: &JointDescriptor, key: &'static str) -> Result<T, HalError> {
    let raw = desc.param(key).unwrap_or_default();
    raw.parse::<T>().map_err(|_| invalid(desc, key, raw))
}

fn parse_finite(desc: &JointDescriptor, key: &'static str) -> Result<f64, HalError> {
    let value = parse_value::<f64>(desc, key)?;
    if !value.is_finite() {
        return Err(invalid(desc, key, desc.param(key).unwrap_or_default()));
    }
    Ok(value)
}

/// Optional positive number; missing or non-positive means absent.
fn parse_positive(desc: &JointDescriptor, key: &'static str) -> Result<Option<f64>, HalError> {
    if desc.param(key).is_none() {
        return Ok(None);
    }
    let value = parse_finite(desc, key)?;
    if value <= 0.0 {
        debug!("Joint '{}': {} = {} is not positive, treated as absent", desc.name, key, value);
        return Ok(None);
    }
    Ok(Some(value))
}

fn parse_flag(desc: &JointDescriptor, key: &'static str) -> Result<bool, HalError> {
    let Some(raw) = desc.param(key) else {
        return Ok(false);
    };
    if let Ok(number) = raw.parse::<i64>() {
        return Ok(number == 1);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(desc, key, raw)),
    }
}
