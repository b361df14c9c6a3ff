#[derive(Debug)]
pub struct Capability {
    /// Supports `SELECT ... FOR UPDATE SKIP LOCKED`.
    pub select_for_update_skip_locked: bool,

    /// Supports transactions that take the database write lock up front
    /// (`BEGIN IMMEDIATE`). Used when row locks are not available.
    pub exclusive_begin: bool,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        select_for_update_skip_locked: false,
        exclusive_begin: true,
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        select_for_update_skip_locked: true,
        exclusive_begin: false,
    };
}
