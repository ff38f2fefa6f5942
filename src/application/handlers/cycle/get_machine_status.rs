//! GetMachineStatusHandler - query handler for per-machine state.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::cycle::Cycle;
use crate::domain::foundation::{DomainError, MachineType};
use crate::ports::LaundryStore;

/// Whether a machine currently has an open cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Idle,
    Running,
}

/// State of one machine plus its latest cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineStatus {
    pub machine_type: MachineType,
    pub state: MachineState,
    pub latest_cycle: Option<Cycle>,
}

/// Handler for the machine status query.
pub struct GetMachineStatusHandler {
    store: Arc<dyn LaundryStore>,
}

impl GetMachineStatusHandler {
    pub fn new(store: Arc<dyn LaundryStore>) -> Self {
        Self { store }
    }

    /// Returns one entry per machine type, in [`MachineType::all`] order.
    pub async fn handle(&self) -> Result<Vec<MachineStatus>, DomainError> {
        let mut tx = self.store.begin().await?;

        let mut statuses = Vec::with_capacity(MachineType::all().len());
        for &machine_type in MachineType::all() {
            let latest_cycle = tx.find_most_recent_cycle(machine_type).await?;
            let state = match &latest_cycle {
                Some(cycle) if cycle.is_open() => MachineState::Running,
                _ => MachineState::Idle,
            };
            statuses.push(MachineStatus {
                machine_type,
                state,
                latest_cycle,
            });
        }

        tx.commit().await?;
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLaundryStore;
    use crate::domain::cycle::NewCycle;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn reports_running_and_idle_machines() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.create_cycle(NewCycle::new(
            MachineType::Washer,
            Timestamp::parse_rfc3339("2024-01-01T10:00:00Z").unwrap(),
        ))
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let handler = GetMachineStatusHandler::new(Arc::new(store));
        let statuses = handler.handle().await.unwrap();

        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].machine_type, MachineType::Washer);
        assert_eq!(statuses[0].state, MachineState::Running);
        assert_eq!(statuses[1].machine_type, MachineType::Dryer);
        assert_eq!(statuses[1].state, MachineState::Idle);
        assert!(statuses[1].latest_cycle.is_none());
    }
}
