//! Log database migrations, embedded at build time
//!
//! Each migration is a `(name, sql)` pair applied in name order.

/// All log migrations in application order.
///
/// New migrations get a `NNN_description.sql` file and an entry here.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
