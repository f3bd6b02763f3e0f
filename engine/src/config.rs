//! Engine configuration
//!
//! Settings come from an optional JSON file, then environment variables
//! (a `.env` file is loaded first if present). Environment values win.
//!
//! ## Environment overrides
//! - `SALES_PAYROLL_ADMIN`: comma-separated logins allowed to settle payroll
//! - `SALES_LEASE_TTL_SECS`: claim lease length; `0` disables expiry
//! - `SALES_SWEEP_INTERVAL_SECS`: how often expired claims are cleared
//! - `SALES_CUTOFF_WEEKDAY`: cutoff anchor, e.g. `wed`
//! - `SALES_BASE_COMMISSION_CENTS`, `SALES_PREMIUM_COMMISSION_CENTS`

use std::path::Path;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use shared::{process_info, Cents, CredentialPairId, ProcessId};

use crate::core::cutoff::{default_week_epoch, DEFAULT_ANCHOR};
use crate::core::leases::DEFAULT_LEASE_TTL_SECS;
use crate::core::{CommissionSchedule, CutoffCalendar, LeasePolicy};
use crate::error::{CoreError, CoreResult};

pub const ENV_PAYROLL_ADMIN: &str = "SALES_PAYROLL_ADMIN";
pub const ENV_LEASE_TTL_SECS: &str = "SALES_LEASE_TTL_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "SALES_SWEEP_INTERVAL_SECS";
pub const ENV_CUTOFF_WEEKDAY: &str = "SALES_CUTOFF_WEEKDAY";
pub const ENV_BASE_COMMISSION_CENTS: &str = "SALES_BASE_COMMISSION_CENTS";
pub const ENV_PREMIUM_COMMISSION_CENTS: &str = "SALES_PREMIUM_COMMISSION_CENTS";

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub commission: CommissionSchedule,
    pub payroll: PayrollCalendarConfig,
    /// Logins allowed to generate batches and mark them paid
    pub payroll_admins: Vec<String>,
    pub agents: Vec<AgentEntry>,
    pub credentials: Vec<CredentialEntry>,
    /// `None` or `0` disables lease expiry
    pub lease_ttl_secs: Option<u64>,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollCalendarConfig {
    pub cutoff_weekday: Weekday,
    pub week_epoch: NaiveDate,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub login: String,
    pub display_name: String,
}

/// One shared login in the credential pool
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub group: String,
    pub username: String,
    pub secret: String,
}

impl CredentialEntry {
    pub fn pair(&self) -> CredentialPairId {
        CredentialPairId::new(self.group.as_str(), self.username.as_str())
    }
}

impl std::fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("group", &self.group)
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commission: CommissionSchedule::default(),
            payroll: PayrollCalendarConfig::default(),
            payroll_admins: Vec::new(),
            agents: Vec::new(),
            credentials: Vec::new(),
            lease_ttl_secs: Some(DEFAULT_LEASE_TTL_SECS),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl Default for PayrollCalendarConfig {
    fn default() -> Self {
        Self {
            cutoff_weekday: DEFAULT_ANCHOR,
            week_epoch: default_week_epoch(),
            utc_offset_minutes: 0,
        }
    }
}

impl EngineConfig {
    /// Load from `path` (if given) and the process environment
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let _ = dotenv::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        process_info!(
            ProcessId::current(),
            "⚙️ Configuration loaded: {} agents, {} credential pairs, cutoff {}",
            config.agents.len(),
            config.credentials.len(),
            config.payroll.cutoff_weekday
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::config("config", format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| CoreError::config("config", format!("invalid JSON in {}: {e}", path.display())))
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(admins) = lookup(ENV_PAYROLL_ADMIN) {
            self.payroll_admins = admins
                .split(',')
                .map(str::trim)
                .filter(|login| !login.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(ttl) = lookup(ENV_LEASE_TTL_SECS) {
            let secs: u64 = parse_value(ENV_LEASE_TTL_SECS, &ttl)?;
            self.lease_ttl_secs = (secs > 0).then_some(secs);
        }
        if let Some(interval) = lookup(ENV_SWEEP_INTERVAL_SECS) {
            self.sweep_interval_secs = parse_value(ENV_SWEEP_INTERVAL_SECS, &interval)?;
        }
        if let Some(weekday) = lookup(ENV_CUTOFF_WEEKDAY) {
            self.payroll.cutoff_weekday = weekday
                .trim()
                .parse()
                .map_err(|_| CoreError::config(ENV_CUTOFF_WEEKDAY, format!("unknown weekday '{weekday}'")))?;
        }
        if let Some(base) = lookup(ENV_BASE_COMMISSION_CENTS) {
            self.commission.base_cents = parse_value::<Cents>(ENV_BASE_COMMISSION_CENTS, &base)?;
        }
        if let Some(premium) = lookup(ENV_PREMIUM_COMMISSION_CENTS) {
            self.commission.premium_cents = parse_value::<Cents>(ENV_PREMIUM_COMMISSION_CENTS, &premium)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.commission.base_cents < 0 || self.commission.premium_cents < 0 {
            return Err(CoreError::config("commission", "rates must not be negative"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(CoreError::config("sweep_interval_secs", "must be greater than zero"));
        }
        let mut pairs: Vec<_> = self.credentials.iter().map(CredentialEntry::pair).collect();
        pairs.sort();
        if pairs.windows(2).any(|window| window[0] == window[1]) {
            return Err(CoreError::config("credentials", "duplicate credential pair"));
        }
        self.calendar().map(|_| ())
    }

    pub fn calendar(&self) -> CoreResult<CutoffCalendar> {
        CutoffCalendar::new(
            self.payroll.cutoff_weekday,
            self.payroll.week_epoch,
            self.payroll.utc_offset_minutes,
        )
    }

    pub fn lease_policy(&self) -> LeasePolicy {
        LeasePolicy::from_secs(self.lease_ttl_secs)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> CoreResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::config(key, format!("invalid value '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.payroll.cutoff_weekday, Weekday::Wed);
        assert_eq!(config.lease_ttl_secs, Some(8 * 60 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{
            "payroll_admins": ["marta@example.com"],
            "commission": { "premium_cents": 20000 },
            "credentials": [{ "group": "movistar", "username": "ventas01", "secret": "s3cret" }]
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.commission.base_cents, CommissionSchedule::DEFAULT_BASE_CENTS);
        assert_eq!(config.commission.premium_cents, 20_000);
        assert_eq!(config.payroll.week_epoch, default_week_epoch());
        assert_eq!(config.credentials[0].pair(), CredentialPairId::new("movistar", "ventas01"));
        assert!(!format!("{:?}", config.credentials[0]).contains("s3cret"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config
            .apply_overrides(lookup(&[
                (ENV_PAYROLL_ADMIN, "marta@example.com, jefe@example.com"),
                (ENV_LEASE_TTL_SECS, "0"),
                (ENV_CUTOFF_WEEKDAY, "fri"),
                (ENV_BASE_COMMISSION_CENTS, "9000"),
            ]))
            .unwrap();

        assert_eq!(config.payroll_admins, vec!["marta@example.com", "jefe@example.com"]);
        assert_eq!(config.lease_ttl_secs, None);
        assert_eq!(config.lease_policy(), LeasePolicy::never_expires());
        assert_eq!(config.payroll.cutoff_weekday, Weekday::Fri);
        assert_eq!(config.commission.base_cents, 9_000);
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let mut config = EngineConfig::default();
        assert_matches!(
            config.apply_overrides(lookup(&[(ENV_SWEEP_INTERVAL_SECS, "soon")])),
            Err(CoreError::Configuration { field, .. }) if field == ENV_SWEEP_INTERVAL_SECS
        );
    }

    #[test]
    fn test_duplicate_pairs_rejected() {
        let entry = CredentialEntry {
            group: "movistar".to_string(),
            username: "ventas01".to_string(),
            secret: "x".to_string(),
        };
        let config = EngineConfig {
            credentials: vec![entry.clone(), entry],
            ..EngineConfig::default()
        };
        assert_matches!(config.validate(), Err(CoreError::Configuration { .. }));
    }
}
