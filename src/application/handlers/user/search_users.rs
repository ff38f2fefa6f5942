//! SearchUsersHandler - query handler for name prefix lookups.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ValidationError};
use crate::domain::user::{User, UserName};
use crate::ports::LaundryStore;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Query for users whose name starts with `prefix`.
#[derive(Debug, Clone)]
pub struct SearchUsersQuery {
    pub prefix: String,
}

/// Handler for user search.
pub struct SearchUsersHandler {
    store: Arc<dyn LaundryStore>,
    page_size: u32,
}

impl SearchUsersHandler {
    pub fn new(store: Arc<dyn LaundryStore>) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: Arc<dyn LaundryStore>, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Newest users first, at most one page.
    pub async fn handle(&self, query: SearchUsersQuery) -> Result<Vec<User>, DomainError> {
        let prefix = query.prefix.trim();
        let len = prefix.chars().count();
        if len > UserName::MAX_LEN {
            return Err(ValidationError::too_long("name", UserName::MAX_LEN, len).into());
        }

        let mut tx = self.store.begin().await?;
        let users = tx.search_users(prefix, self.page_size).await?;
        tx.commit().await?;
        Ok(users)
    }
}
