use std::time::Duration;

use crate::db::{DbPool, OrmConn};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    /// Upper bound on the lifetime of any single workflow transaction.
    pub txn_deadline: Duration,
}
