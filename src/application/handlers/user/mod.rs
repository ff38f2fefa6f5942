//! User query handlers.

mod search_users;

pub use search_users::{SearchUsersHandler, SearchUsersQuery, DEFAULT_PAGE_SIZE};
