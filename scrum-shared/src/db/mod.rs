/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: schema migration runner
///
/// The queries themselves live with [`PgStore`](crate::repo::PgStore).

pub mod migrations;
pub mod pool;
