//! JSON file configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Simulation parameters.
///
/// Every field must be positive; `validate` runs on every load and
/// update so the core only ever sees already-validated numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Lifetime issuance limit: tickets ever created per pool lifetime.
    pub total_tickets: u32,
    /// Tickets simultaneously held unsold in the pool.
    pub max_ticket_capacity: u32,
    /// Batch size of each vendor release.
    pub tickets_per_release: u32,
    /// Seconds a vendor waits between releases.
    pub ticket_release_interval_secs: u64,
    /// Seconds a customer waits after a successful purchase.
    pub customer_retrieval_interval_secs: u64,
    pub vendor_count: u32,
    pub customer_count: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_tickets: 100,
            max_ticket_capacity: 20,
            tickets_per_release: 5,
            ticket_release_interval_secs: 2,
            customer_retrieval_interval_secs: 3,
            vendor_count: 3,
            customer_count: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("configuration field `{field}` must be positive")]
    NonPositive { field: &'static str },
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("totalTickets", u64::from(self.total_tickets)),
            ("maxTicketCapacity", u64::from(self.max_ticket_capacity)),
            ("ticketsPerRelease", u64::from(self.tickets_per_release)),
            ("ticketReleaseIntervalSecs", self.ticket_release_interval_secs),
            (
                "customerRetrievalIntervalSecs",
                self.customer_retrieval_interval_secs,
            ),
            ("vendorCount", u64::from(self.vendor_count)),
            ("customerCount", u64::from(self.customer_count)),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive { field });
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let pretty = serde_json::to_string_pretty(self)?;
        std::fs::write(path, pretty)?;
        Ok(())
    }

    /// Load `path`, or write the defaults there when it does not exist.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_fields_are_rejected() {
        let cases: Vec<(fn(&mut SimulationConfig), &str)> = vec![
            (|c| c.total_tickets = 0, "totalTickets"),
            (|c| c.max_ticket_capacity = 0, "maxTicketCapacity"),
            (|c| c.tickets_per_release = 0, "ticketsPerRelease"),
            (|c| c.ticket_release_interval_secs = 0, "ticketReleaseIntervalSecs"),
            (
                |c| c.customer_retrieval_interval_secs = 0,
                "customerRetrievalIntervalSecs",
            ),
            (|c| c.vendor_count = 0, "vendorCount"),
            (|c| c.customer_count = 0, "customerCount"),
        ];

        for (mutate, expected) in cases {
            let mut config = SimulationConfig::default();
            mutate(&mut config);
            match config.validate() {
                Err(ConfigError::NonPositive { field }) => assert_eq!(field, expected),
                other => panic!("expected NonPositive for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn default_config_json_shape() {
        insta::assert_json_snapshot!(SimulationConfig::default(), @r#"
        {
          "totalTickets": 100,
          "maxTicketCapacity": 20,
          "ticketsPerRelease": 5,
          "ticketReleaseIntervalSecs": 2,
          "customerRetrievalIntervalSecs": 3,
          "vendorCount": 3,
          "customerCount": 5
        }
        "#);
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "turnstile-config-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let config = SimulationConfig {
            total_tickets: 50,
            ..SimulationConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = SimulationConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let path = std::env::temp_dir().join(format!(
            "turnstile-config-invalid-{}.json",
            std::process::id()
        ));
        let mut config = SimulationConfig::default();
        config.vendor_count = 0;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert!(matches!(
            SimulationConfig::load(&path),
            Err(ConfigError::NonPositive { field: "vendorCount" })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_or_create_writes_defaults() {
        let path = std::env::temp_dir().join(format!(
            "turnstile-config-create-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let created = SimulationConfig::load_or_create(&path).unwrap();
        assert_eq!(created, SimulationConfig::default());
        assert!(path.exists());

        let reloaded = SimulationConfig::load_or_create(&path).unwrap();
        assert_eq!(reloaded, created);
        let _ = std::fs::remove_file(&path);
    }
}
