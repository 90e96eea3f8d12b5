//! Controller configuration.
//!
//! Read once from environment variables at start-up.

use crate::error::ControllerError;
use std::time::Duration;

/// Fraction of free addresses below which `IPPoolPressure` is raised
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = 0.10;

const DEFAULT_VSPHERE_URL: &str = "https://vcenter.local";
const DEFAULT_RESYNC_SECONDS: u64 = 300;

/// Runtime configuration of the network controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Namespace to watch for Networks; all namespaces when `None`
    pub namespace: Option<String>,
    /// vCenter base URL
    pub vsphere_url: String,
    /// vCenter API session token
    pub vsphere_token: String,
    /// Free-address ratio below which a pool set is under pressure
    pub pressure_threshold: f64,
    /// Interval between full port-config resyncs
    pub resync_interval: Duration,
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let vsphere_url = lookup("VSPHERE_URL").unwrap_or_else(|| DEFAULT_VSPHERE_URL.to_string());
        let vsphere_token = lookup("VSPHERE_TOKEN").ok_or_else(|| {
            ControllerError::InvalidConfig("VSPHERE_TOKEN environment variable is required".to_string())
        })?;
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let pressure_threshold = match lookup("IPPOOL_PRESSURE_THRESHOLD") {
            Some(raw) => parse_threshold(&raw)?,
            None => DEFAULT_PRESSURE_THRESHOLD,
        };

        let resync_seconds = match lookup("PORT_CONFIG_RESYNC_SECONDS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                ControllerError::InvalidConfig(format!(
                    "PORT_CONFIG_RESYNC_SECONDS must be a positive integer, got {:?}",
                    raw
                ))
            })?,
            None => DEFAULT_RESYNC_SECONDS,
        };

        Ok(Self {
            namespace,
            vsphere_url,
            vsphere_token,
            pressure_threshold,
            resync_interval: Duration::from_secs(resync_seconds),
        })
    }
}

fn parse_threshold(raw: &str) -> Result<f64, ControllerError> {
    raw.parse::<f64>()
        .ok()
        .filter(|t| *t > 0.0 && *t <= 1.0)
        .ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "IPPOOL_PRESSURE_THRESHOLD must be a fraction in (0, 1], got {:?}",
                raw
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::from_lookup(lookup_from(&[("VSPHERE_TOKEN", "t")])).unwrap();
        assert_eq!(config.vsphere_url, "https://vcenter.local");
        assert_eq!(config.namespace, None);
        assert!((config.pressure_threshold - 0.10).abs() < f64::EPSILON);
        assert_eq!(config.resync_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_token_required() {
        let err = ControllerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn test_threshold_bounds() {
        for bad in ["0", "1.5", "-0.1", "ten"] {
            let result = ControllerConfig::from_lookup(lookup_from(&[
                ("VSPHERE_TOKEN", "t"),
                ("IPPOOL_PRESSURE_THRESHOLD", bad),
            ]));
            assert!(result.is_err(), "{bad} should be rejected");
        }

        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("VSPHERE_TOKEN", "t"),
            ("IPPOOL_PRESSURE_THRESHOLD", "0.25"),
            ("WATCH_NAMESPACE", "tenant-a"),
            ("PORT_CONFIG_RESYNC_SECONDS", "60"),
        ]))
        .unwrap();
        assert!((config.pressure_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.namespace.as_deref(), Some("tenant-a"));
        assert_eq!(config.resync_interval, Duration::from_secs(60));
    }
}
