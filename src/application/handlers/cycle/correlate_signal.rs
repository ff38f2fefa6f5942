//! CycleCorrelator - drives per-machine cycle state from bus signals.
//!
//! Each machine type is either idle (no open cycle) or running (one open
//! cycle). A start while idle opens a cycle and attaches everyone waiting
//! for it; a finish while running closes the cycle and notifies the
//! registered users. Anything else is treated as replay noise.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::cycle::{Cycle, MachineSignal, NewCycle, SignalKind};
use crate::domain::foundation::{CycleId, DomainError, MachineType, RegistrationId, Timestamp};
use crate::ports::LaundryStore;

use super::dispatch_notifications::{DispatchReport, NotificationDispatcher};

/// What a signal did to the machine's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationOutcome {
    /// Idle machine started; pending registrations now point at the cycle.
    CycleStarted {
        cycle: Cycle,
        attached: Vec<RegistrationId>,
    },
    /// Start while a cycle is already open. `open_cycle` is `None` when the
    /// store rejected the insert without the open cycle being visible yet.
    DuplicateStart { open_cycle: Option<CycleId> },
    /// Start older than the most recent cycle of the type.
    StaleStart { latest_cycle: CycleId },
    /// Running machine finished; notifications went out.
    CycleFinished { cycle: Cycle, report: DispatchReport },
    /// Finish for a cycle that is already closed.
    DuplicateFinish { cycle_id: CycleId },
    /// Finish with no cycle of that type on record.
    UnmatchedFinish,
}

/// Applies machine signals to the store, one transaction per signal.
///
/// Each transaction holds the machine's store lock, so a signal never
/// interleaves with a registration for the same machine type.
pub struct CycleCorrelator {
    store: Arc<dyn LaundryStore>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl CycleCorrelator {
    pub fn new(store: Arc<dyn LaundryStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub async fn handle(&self, signal: MachineSignal) -> Result<CorrelationOutcome, DomainError> {
        match signal.kind {
            SignalKind::Started => self.on_started(signal.machine_type, signal.at).await,
            SignalKind::Finished => self.on_finished(signal.machine_type, signal.at).await,
        }
    }

    async fn on_started(
        &self,
        machine_type: MachineType,
        started_at: Timestamp,
    ) -> Result<CorrelationOutcome, DomainError> {
        let mut tx = self.store.begin().await?;
        tx.lock_machine(machine_type).await?;

        if let Some(recent) = tx.find_most_recent_cycle(machine_type).await? {
            if recent.is_open() {
                info!(
                    machine_type = %machine_type,
                    cycle_id = %recent.id(),
                    started_at = %started_at,
                    "Ignoring start for running machine"
                );
                return Ok(CorrelationOutcome::DuplicateStart {
                    open_cycle: Some(recent.id()),
                });
            }
            if !recent.started_at().is_before(&started_at) {
                warn!(
                    machine_type = %machine_type,
                    cycle_id = %recent.id(),
                    started_at = %started_at,
                    latest_started_at = %recent.started_at(),
                    "Ignoring start older than the latest cycle"
                );
                return Ok(CorrelationOutcome::StaleStart {
                    latest_cycle: recent.id(),
                });
            }
        }

        let cycle = match tx
            .create_cycle(NewCycle::new(machine_type, started_at))
            .await
        {
            Ok(cycle) => cycle,
            Err(err) if err.is_conflict() => {
                info!(
                    machine_type = %machine_type,
                    started_at = %started_at,
                    "Store already holds an open cycle, ignoring start"
                );
                return Ok(CorrelationOutcome::DuplicateStart { open_cycle: None });
            }
            Err(err) => return Err(err),
        };

        let mut attached = Vec::new();
        for pending in tx.find_pending_registrations(machine_type).await? {
            let registration = tx.attach_cycle(pending.id(), cycle.id()).await?;
            debug!(
                registration_id = %registration.id(),
                cycle_id = %cycle.id(),
                "Attached pending registration"
            );
            attached.push(registration.id());
        }

        tx.commit().await?;

        info!(
            machine_type = %machine_type,
            cycle_id = %cycle.id(),
            started_at = %started_at,
            attached = attached.len(),
            "Cycle started"
        );

        Ok(CorrelationOutcome::CycleStarted { cycle, attached })
    }

    async fn on_finished(
        &self,
        machine_type: MachineType,
        finished_at: Timestamp,
    ) -> Result<CorrelationOutcome, DomainError> {
        let (cycle, recipients) = {
            let mut tx = self.store.begin().await?;
            tx.lock_machine(machine_type).await?;

            let Some(recent) = tx.find_most_recent_cycle(machine_type).await? else {
                warn!(
                    machine_type = %machine_type,
                    finished_at = %finished_at,
                    "Finish without any cycle on record"
                );
                return Ok(CorrelationOutcome::UnmatchedFinish);
            };

            if recent.is_finished() {
                info!(
                    machine_type = %machine_type,
                    cycle_id = %recent.id(),
                    finished_at = %finished_at,
                    "Ignoring duplicate finish"
                );
                return Ok(CorrelationOutcome::DuplicateFinish {
                    cycle_id: recent.id(),
                });
            }

            let cycle = tx.mark_cycle_finished(recent.id(), finished_at).await?;
            // Read with the finish so a failed read leaves the cycle open
            // for the replayed signal.
            let recipients = tx.find_recipients_for_cycle(cycle.id()).await?;
            tx.commit().await?;
            (cycle, recipients)
        };

        info!(
            machine_type = %machine_type,
            cycle_id = %cycle.id(),
            finished_at = %finished_at,
            recipients = recipients.len(),
            "Cycle finished"
        );

        let report = self.dispatcher.dispatch(&cycle, recipients).await;

        Ok(CorrelationOutcome::CycleFinished { cycle, report })
    }
}
