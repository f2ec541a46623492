use anyhow::Result;
use diesel::{
    Connection, PgConnection,
    connection::CacheSize,
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Every connection handed out by the pool has its prepared-statement cache
/// disabled on acquire.
#[derive(Debug)]
struct DisableStatementCache;

impl CustomizeConnection<PgConnection, R2d2Error> for DisableStatementCache {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        Ok(())
    }
}

pub fn establish_connection(database_url: &str) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .connection_customizer(Box::new(DisableStatementCache))
        .build(manager)?;
    Ok(pool)
}
