//! Static identity directory built from configuration

use std::collections::{HashMap, HashSet};

use shared::AgentId;

use crate::config::EngineConfig;
use crate::traits::Directory;

#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<AgentId, String>,
    payroll_admins: HashSet<AgentId>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let mut directory = Self::new();
        for agent in &config.agents {
            directory = directory.with_agent(agent.login.as_str(), agent.display_name.as_str());
        }
        for admin in &config.payroll_admins {
            directory = directory.with_payroll_admin(admin.as_str());
        }
        directory
    }

    pub fn with_agent(mut self, login: impl Into<AgentId>, display_name: impl Into<String>) -> Self {
        self.names.insert(login.into(), display_name.into());
        self
    }

    pub fn with_payroll_admin(mut self, login: impl Into<AgentId>) -> Self {
        self.payroll_admins.insert(login.into());
        self
    }
}

impl Directory for StaticDirectory {
    fn display_name(&self, agent: &AgentId) -> Option<String> {
        self.names.get(agent).cloned()
    }

    fn is_payroll_admin(&self, agent: &AgentId) -> bool {
        self.payroll_admins.contains(agent)
    }
}
