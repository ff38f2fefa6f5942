//! User entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::UserName;

/// A person who has registered interest at least once.
///
/// Users are created lazily by registration intake and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: UserName,
    created_at: Timestamp,
}

impl User {
    pub fn reconstitute(id: UserId, name: UserName, created_at: Timestamp) -> Self {
        Self {
            id,
            name,
            created_at,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}
