//! PostgreSQL implementation of the laundry store ports.
//!
//! Every [`PostgresTransaction`] wraps one database transaction. Uniqueness
//! is enforced by the partial unique indexes created in `migrations/`, and
//! unique violations surface as `ErrorCode::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::cycle::{Cycle, NewCycle};
use crate::domain::foundation::{
    CycleId, DomainError, ErrorCode, MachineType, RegistrationId, Timestamp, UserId,
};
use crate::domain::registration::{NewRegistration, Registration};
use crate::domain::user::{User, UserName};
use crate::ports::{CycleStore, LaundryStore, RegistrationStore, StoreTransaction, UserStore};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Advisory lock key for a machine type, namespaced so other users of
/// advisory locks on the same database cannot collide with it.
fn machine_lock_key(machine_type: MachineType) -> String {
    format!("laundry_notify.machine.{}", machine_type.as_str())
}

/// PostgreSQL-backed laundry store.
#[derive(Clone)]
pub struct PostgresLaundryStore {
    pool: PgPool,
}

impl PostgresLaundryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::database("run migrations", e))
    }
}

#[async_trait]
impl LaundryStore for PostgresLaundryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("begin transaction", e))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// One open database transaction.
///
/// Dropping it without [`StoreTransaction::commit`] rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit transaction", e))
    }
}

#[async_trait]
impl CycleStore for PostgresTransaction {
    async fn lock_machine(&mut self, machine_type: MachineType) -> Result<(), DomainError> {
        // Released automatically at commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(machine_lock_key(machine_type))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock machine", e))?;
        Ok(())
    }

    async fn find_most_recent_cycle(
        &mut self,
        machine_type: MachineType,
    ) -> Result<Option<Cycle>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, machine_type, started_at, finished_at
            FROM cycles
            WHERE machine_type = $1
            ORDER BY started_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(machine_type.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("fetch most recent cycle", e))?;

        row.map(row_to_cycle).transpose()
    }

    async fn find_cycle(&mut self, id: CycleId) -> Result<Option<Cycle>, DomainError> {
        let row = sqlx::query(
            "SELECT id, machine_type, started_at, finished_at FROM cycles WHERE id = $1",
        )
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("fetch cycle", e))?;

        row.map(row_to_cycle).transpose()
    }

    async fn create_cycle(&mut self, new_cycle: NewCycle) -> Result<Cycle, DomainError> {
        new_cycle.validate()?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO cycles (machine_type, started_at) VALUES ($1, $2) RETURNING id",
        )
        .bind(new_cycle.machine_type.as_str())
        .bind(*new_cycle.started_at.as_datetime())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert cycle", e))?;

        Ok(new_cycle.into_cycle(CycleId::from_raw(id)))
    }

    async fn mark_cycle_finished(
        &mut self,
        id: CycleId,
        finished_at: Timestamp,
    ) -> Result<Cycle, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, machine_type, started_at, finished_at
            FROM cycles WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock cycle", e))?;

        let mut cycle = row.map(row_to_cycle).transpose()?.ok_or_else(|| {
            DomainError::new(ErrorCode::CycleNotFound, format!("Cycle not found: {}", id))
        })?;
        cycle.finish(finished_at)?;

        sqlx::query("UPDATE cycles SET finished_at = $2 WHERE id = $1")
            .bind(id.value())
            .bind(*finished_at.as_datetime())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("finish cycle", e))?;

        Ok(cycle)
    }
}

#[async_trait]
impl RegistrationStore for PostgresTransaction {
    async fn find_pending_registrations(
        &mut self,
        machine_type: MachineType,
    ) -> Result<Vec<Registration>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, machine_type, cycle_id, created_at
            FROM registrations
            WHERE machine_type = $1 AND cycle_id IS NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(machine_type.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("fetch pending registrations", e))?;

        rows.into_iter().map(row_to_registration).collect()
    }

    async fn find_outstanding_registrations(
        &mut self,
        user_name: &UserName,
        machine_type: MachineType,
    ) -> Result<Vec<Registration>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.user_id, r.machine_type, r.cycle_id, r.created_at
            FROM registrations r
            JOIN users u ON u.id = r.user_id
            LEFT JOIN cycles c ON c.id = r.cycle_id
            WHERE u.name = $1
              AND r.machine_type = $2
              AND (r.cycle_id IS NULL OR c.finished_at IS NULL)
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .bind(user_name.as_str())
        .bind(machine_type.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("fetch outstanding registrations", e))?;

        rows.into_iter().map(row_to_registration).collect()
    }

    async fn create_registration(
        &mut self,
        new_registration: NewRegistration,
    ) -> Result<Registration, DomainError> {
        new_registration.validate()?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO registrations (user_id, machine_type, cycle_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(new_registration.user_id.value())
        .bind(new_registration.machine_type.as_str())
        .bind(new_registration.cycle_id.map(|id| id.value()))
        .bind(*new_registration.created_at.as_datetime())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert registration", e))?;

        Ok(new_registration.into_registration(RegistrationId::from_raw(id)))
    }

    async fn attach_cycle(
        &mut self,
        registration_id: RegistrationId,
        cycle_id: CycleId,
    ) -> Result<Registration, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, machine_type, cycle_id, created_at
            FROM registrations WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(registration_id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock registration", e))?;

        let mut registration = row.map(row_to_registration).transpose()?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::RegistrationNotFound,
                format!("Registration not found: {}", registration_id),
            )
        })?;
        registration.attach(cycle_id)?;

        sqlx::query("UPDATE registrations SET cycle_id = $2 WHERE id = $1")
            .bind(registration_id.value())
            .bind(cycle_id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("attach registration", e))?;

        Ok(registration)
    }

    async fn find_recipients_for_cycle(
        &mut self,
        cycle_id: CycleId,
    ) -> Result<Vec<UserName>, DomainError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT u.name
            FROM registrations r
            JOIN users u ON u.id = r.user_id
            WHERE r.cycle_id = $1
            GROUP BY u.name
            ORDER BY MIN(r.id)
            "#,
        )
        .bind(cycle_id.value())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("fetch recipients", e))?;

        names
            .into_iter()
            .map(|name| UserName::new(name).map_err(corrupt_row))
            .collect()
    }
}

#[async_trait]
impl UserStore for PostgresTransaction {
    async fn find_user_by_name(&mut self, name: &UserName) -> Result<Option<User>, DomainError> {
        let row = sqlx::query("SELECT id, name, created_at FROM users WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch user", e))?;

        row.map(row_to_user).transpose()
    }

    async fn create_user(&mut self, name: &UserName) -> Result<User, DomainError> {
        // NOW() is the transaction start time.
        let row = sqlx::query(
            "INSERT INTO users (name, created_at) VALUES ($1, NOW()) RETURNING id, name, created_at",
        )
        .bind(name.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert user", e))?;

        row_to_user(row)
    }

    async fn search_users(&mut self, prefix: &str, limit: u32) -> Result<Vec<User>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, created_at
            FROM users
            WHERE name LIKE $1 ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(format!("{}%", escape_like(prefix)))
        .bind(i64::from(limit))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("search users", e))?;

        rows.into_iter().map(row_to_user).collect()
    }
}

/// Escapes LIKE wildcards so the prefix matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());

    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => DomainError::new(
            ErrorCode::Conflict,
            format!("Failed to {}: {}", operation, err),
        ),
        Some(FOREIGN_KEY_VIOLATION) => DomainError::new(
            ErrorCode::ValidationFailed,
            format!("Failed to {}: referenced row does not exist", operation),
        ),
        _ => DomainError::database(operation, err),
    }
}

fn corrupt_row(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid row in database: {}", err),
    )
}

fn column<T>(row: &PgRow, name: &str) -> Result<T, DomainError>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("read column {}", name), e))
}

fn machine_type_column(row: &PgRow) -> Result<MachineType, DomainError> {
    column::<String>(row, "machine_type")?
        .parse::<MachineType>()
        .map_err(corrupt_row)
}

fn timestamp_column(row: &PgRow, name: &str) -> Result<Timestamp, DomainError> {
    column::<DateTime<Utc>>(row, name).map(Timestamp::from_datetime)
}

fn row_to_cycle(row: PgRow) -> Result<Cycle, DomainError> {
    let finished_at: Option<DateTime<Utc>> = column(&row, "finished_at")?;
    Ok(Cycle::reconstitute(
        CycleId::from_raw(column(&row, "id")?),
        machine_type_column(&row)?,
        timestamp_column(&row, "started_at")?,
        finished_at.map(Timestamp::from_datetime),
    ))
}

fn row_to_registration(row: PgRow) -> Result<Registration, DomainError> {
    let cycle_id: Option<i64> = column(&row, "cycle_id")?;
    Ok(Registration::reconstitute(
        RegistrationId::from_raw(column(&row, "id")?),
        UserId::from_raw(column(&row, "user_id")?),
        machine_type_column(&row)?,
        cycle_id.map(CycleId::from_raw),
        timestamp_column(&row, "created_at")?,
    ))
}

fn row_to_user(row: PgRow) -> Result<User, DomainError> {
    let name: String = column(&row, "name")?;
    Ok(User::reconstitute(
        UserId::from_raw(column(&row, "id")?),
        UserName::new(name).map_err(corrupt_row)?,
        timestamp_column(&row, "created_at")?,
    ))
}
