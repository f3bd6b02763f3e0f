//! Test fixtures and data for webserver tests

use chrono::{DateTime, TimeZone, Utc};
use engine::config::{AgentEntry, CredentialEntry, EngineConfig};
use serde_json::{json, Value};

pub struct TestFixtures;

impl TestFixtures {
    pub const ANA: &'static str = "ana@example.com";
    pub const LUIS: &'static str = "luis@example.com";
    pub const ADMIN: &'static str = "marta@example.com";

    pub const GROUP: &'static str = "movistar";
    pub const USERNAME: &'static str = "ventas01";
    pub const SECRET: &'static str = "Pa55word!";

    /// 2025-06-10, a Tuesday
    pub fn tuesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap()
    }

    pub fn new_client(service_type: &str) -> Value {
        json!({
            "full_name": "Rosa Medina",
            "phone": "555-0101",
            "service_type": service_type,
        })
    }

    pub fn config() -> EngineConfig {
        EngineConfig {
            payroll_admins: vec![Self::ADMIN.to_string()],
            agents: vec![AgentEntry {
                login: Self::ANA.to_string(),
                display_name: "Ana Torres".to_string(),
            }],
            credentials: vec![CredentialEntry {
                group: Self::GROUP.to_string(),
                username: Self::USERNAME.to_string(),
                secret: Self::SECRET.to_string(),
            }],
            ..EngineConfig::default()
        }
    }

    pub fn slot_uri(channel: &str, action: &str) -> String {
        format!("/api/credentials/{}/{}/{}/{}", Self::GROUP, Self::USERNAME, channel, action)
    }

    pub fn reveal_uri() -> String {
        format!("/api/credentials/{}/{}/reveal", Self::GROUP, Self::USERNAME)
    }
}
