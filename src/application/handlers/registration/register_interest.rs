//! RegisterInterestHandler - command handler for `Register(name, type)`.
//!
//! A registration targets the running cycle of the machine if there is one,
//! otherwise the next cycle that starts. Registering twice for the same
//! target is harmless and reported as `already_registered`.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::foundation::{DomainError, ErrorCode, MachineType, Timestamp};
use crate::domain::registration::{NewRegistration, RegistrationOutcome, RegistrationTarget};
use crate::domain::user::{User, UserName};
use crate::ports::LaundryStore;

/// Raw registration request as received from the front end.
#[derive(Debug, Clone)]
pub struct RegisterInterestCommand {
    pub name: String,
    pub machine_type: String,
}

/// Handler for registration intake.
pub struct RegisterInterestHandler {
    store: Arc<dyn LaundryStore>,
}

impl RegisterInterestHandler {
    pub fn new(store: Arc<dyn LaundryStore>) -> Self {
        Self { store }
    }

    /// Registers interest and never fails silently: every problem becomes
    /// [`RegistrationOutcome::Error`].
    pub async fn handle(&self, cmd: RegisterInterestCommand) -> RegistrationOutcome {
        let (name, machine_type) = match parse_command(&cmd) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    name = %cmd.name,
                    machine_type = %cmd.machine_type,
                    error = %err,
                    "Rejected registration"
                );
                return RegistrationOutcome::Error {
                    code: err.code,
                    reason: err.message,
                };
            }
        };

        match self.register(&name, machine_type).await {
            Ok(outcome) => {
                info!(
                    name = %name,
                    machine_type = %machine_type,
                    status = outcome.status(),
                    "Registration handled"
                );
                outcome
            }
            Err(err) => {
                error!(
                    name = %name,
                    machine_type = %machine_type,
                    error = %err,
                    "Registration failed"
                );
                RegistrationOutcome::Error {
                    code: err.code,
                    reason: err.message,
                }
            }
        }
    }

    async fn register(
        &self,
        name: &UserName,
        machine_type: MachineType,
    ) -> Result<RegistrationOutcome, DomainError> {
        let user = self.resolve_user(name).await?;

        let mut tx = self.store.begin().await?;
        // A start for this machine either sees our pending row or we see its cycle.
        tx.lock_machine(machine_type).await?;
        let target = match tx.find_most_recent_cycle(machine_type).await? {
            Some(cycle) if cycle.is_open() => RegistrationTarget::CurrentCycle(cycle.id()),
            _ => RegistrationTarget::NextCycle,
        };

        let outstanding = tx
            .find_outstanding_registrations(name, machine_type)
            .await?;
        let existing = outstanding.iter().find(|r| match target {
            RegistrationTarget::CurrentCycle(cycle_id) => r.is_attached_to(cycle_id),
            RegistrationTarget::NextCycle => r.is_pending(),
        });
        if let Some(existing) = existing {
            return Ok(RegistrationOutcome::AlreadyRegistered {
                machine_type,
                registration_id: Some(existing.id()),
                target,
            });
        }

        let created = tx
            .create_registration(NewRegistration {
                user_id: user.id(),
                machine_type,
                cycle_id: target.cycle_id(),
                created_at: Timestamp::now(),
            })
            .await;

        // A concurrent request for the same user and type won the race.
        let registration = match created {
            Ok(registration) => registration,
            Err(err) if err.is_conflict() => {
                return Ok(RegistrationOutcome::AlreadyRegistered {
                    machine_type,
                    registration_id: None,
                    target,
                })
            }
            Err(err) => return Err(err),
        };

        match tx.commit().await {
            Ok(()) => Ok(RegistrationOutcome::Registered {
                registration,
                target,
            }),
            Err(err) if err.is_conflict() => Ok(RegistrationOutcome::AlreadyRegistered {
                machine_type,
                registration_id: None,
                target,
            }),
            Err(err) => Err(err),
        }
    }

    /// Looks the user up, creating it on first use.
    async fn resolve_user(&self, name: &UserName) -> Result<User, DomainError> {
        match self.find_or_create_user(name).await {
            Ok(user) => Ok(user),
            Err(err) if err.is_conflict() => {
                let mut tx = self.store.begin().await?;
                let user = tx.find_user_by_name(name).await?;
                tx.commit().await?;
                user.ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::UserNotFound,
                        format!("User vanished after name conflict: {}", name),
                    )
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn find_or_create_user(&self, name: &UserName) -> Result<User, DomainError> {
        let mut tx = self.store.begin().await?;
        if let Some(user) = tx.find_user_by_name(name).await? {
            tx.commit().await?;
            return Ok(user);
        }
        let user = tx.create_user(name).await?;
        tx.commit().await?;
        info!(name = %name, user_id = %user.id(), "Created user");
        Ok(user)
    }
}

fn parse_command(cmd: &RegisterInterestCommand) -> Result<(UserName, MachineType), DomainError> {
    let name = UserName::new(&cmd.name)?;
    let machine_type = cmd.machine_type.parse::<MachineType>()?;
    Ok((name, machine_type))
}
