//! Test fixtures and data for engine tests

use chrono::{DateTime, TimeZone, Utc};
use engine::config::{AgentEntry, CredentialEntry, EngineConfig};
use shared::{AgentId, CredentialPairId, NewClient, ServiceType};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const ANA: &'static str = "ana@example.com";
    pub const LUIS: &'static str = "luis@example.com";
    pub const ADMIN: &'static str = "marta@example.com";

    pub const GROUP: &'static str = "movistar";
    pub const USERNAME: &'static str = "ventas01";
    pub const SECRET: &'static str = "Pa55word!";
    pub const SPARE_USERNAME: &'static str = "ventas02";

    pub fn ana() -> AgentId {
        AgentId::from(Self::ANA)
    }

    pub fn luis() -> AgentId {
        AgentId::from(Self::LUIS)
    }

    pub fn admin() -> AgentId {
        AgentId::from(Self::ADMIN)
    }

    pub fn pair() -> CredentialPairId {
        CredentialPairId::new(Self::GROUP, Self::USERNAME)
    }

    pub fn spare_pair() -> CredentialPairId {
        CredentialPairId::new(Self::GROUP, Self::SPARE_USERNAME)
    }

    /// 2025-06-10, a Tuesday, mid-afternoon UTC
    pub fn tuesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap()
    }

    /// The following day, the default cutoff anchor
    pub fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 9, 0, 0).unwrap()
    }

    pub fn draft(name: &str, service_type: ServiceType) -> NewClient {
        NewClient {
            full_name: name.to_string(),
            phone: Some("555-0101".to_string()),
            service_type,
        }
    }

    /// Directory with two agents, one payroll admin and two credential pairs
    pub fn config() -> EngineConfig {
        EngineConfig {
            payroll_admins: vec![Self::ADMIN.to_string()],
            agents: vec![
                AgentEntry {
                    login: Self::ANA.to_string(),
                    display_name: "Ana Torres".to_string(),
                },
                AgentEntry {
                    login: Self::LUIS.to_string(),
                    display_name: "Luis Paredes".to_string(),
                },
            ],
            credentials: vec![
                CredentialEntry {
                    group: Self::GROUP.to_string(),
                    username: Self::USERNAME.to_string(),
                    secret: Self::SECRET.to_string(),
                },
                CredentialEntry {
                    group: Self::GROUP.to_string(),
                    username: Self::SPARE_USERNAME.to_string(),
                    secret: "other".to_string(),
                },
            ],
            ..EngineConfig::default()
        }
    }
}
