//! Agent registry
//!
//! Tracks registered worker identities. Membership is observational only:
//! it feeds status reporting and never gates dispatch.

use crate::protocol::AgentInfo;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Thread-safe registry of worker identities in registration order
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Arc<RwLock<Vec<AgentInfo>>>,
}

impl AgentRegistry {
    /// Create a new empty agent registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent; returns false when the id was already present
    pub fn register(&self, agent_id: &str) -> bool {
        let mut agents = match self.agents.write() {
            Ok(agents) => agents,
            Err(poisoned) => poisoned.into_inner(),
        };

        if agents.iter().any(|agent| agent.agent_id == agent_id) {
            debug!(agent_id = %agent_id, "Agent already registered");
            return false;
        }

        agents.push(AgentInfo::new(agent_id));
        info!(agent_id = %agent_id, total = agents.len(), "Registered agent");
        true
    }

    /// Remove an agent; returns false when the id was unknown
    pub fn deregister(&self, agent_id: &str) -> bool {
        let mut agents = match self.agents.write() {
            Ok(agents) => agents,
            Err(poisoned) => poisoned.into_inner(),
        };

        let before = agents.len();
        agents.retain(|agent| agent.agent_id != agent_id);
        let removed = agents.len() < before;

        if removed {
            info!(agent_id = %agent_id, total = agents.len(), "Deregistered agent");
        }
        removed
    }

    /// Get count of registered agents
    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.read().iter().any(|agent| agent.agent_id == agent_id)
    }

    /// Snapshot of all registered agents
    pub fn agents(&self) -> Vec<AgentInfo> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<AgentInfo>> {
        match self.agents.read() {
            Ok(agents) => agents,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
