use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::{info, warn};
use std::path::Path;
use std::time::Duration;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

const MAX_CONNECTION_ATTEMPTS: u32 = 5;

/// Pragmas applied to every pooled SQLite connection
#[derive(Debug)]
pub struct SqliteConnectionCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqliteConnectionCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        use diesel::sql_query;

        // busy_timeout must be in place before anything can contend for the file
        sql_query("PRAGMA busy_timeout = 30000")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        for attempt in 1..=3 {
            match sql_query("PRAGMA journal_mode = WAL").execute(conn) {
                Ok(_) => break,
                Err(e) if attempt == 3 => warn!("Failed to enable WAL mode: {}", e),
                Err(_) => std::thread::sleep(Duration::from_millis(10)),
            }
        }

        for pragma in [
            "PRAGMA foreign_keys = ON",
            "PRAGMA synchronous = NORMAL",
            "PRAGMA cache_size = -16000",
            "PRAGMA temp_store = MEMORY",
        ] {
            if let Err(e) = sql_query(pragma).execute(conn) {
                warn!("Failed to apply `{}`: {}", pragma, e);
            }
        }

        Ok(())
    }
}

/// Creates the connection pool and runs pending migrations
pub fn create_pool(database_url: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(database_url).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(16)
        .min_idle(Some(1))
        .connection_timeout(Duration::from_secs(30))
        .idle_timeout(Some(Duration::from_secs(300)))
        .connection_customizer(Box::new(SqliteConnectionCustomizer))
        .build(manager)?;

    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Failed to run migrations: {}", e))?;

    info!("Registry database ready at {}", database_url);

    Ok(pool)
}

/// Pooled connection with pool failures folded into a diesel error, so the
/// `*Operations` methods can keep a single error type.
pub fn connection(pool: &DbPool) -> Result<DbConnection, diesel::result::Error> {
    get_connection_with_retry(pool).map_err(|e| {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UnableToSendCommand,
            Box::new(e.to_string()),
        )
    })
}

/// True when `err` is a rejected insert on a unique index.
pub fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Gets a connection from the pool, backing off 10ms, 20ms, 40ms... between attempts
pub fn get_connection_with_retry(pool: &DbPool) -> Result<DbConnection, diesel::r2d2::Error> {
    let mut attempts = 0;

    loop {
        match pool.get() {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                attempts += 1;
                if attempts >= MAX_CONNECTION_ATTEMPTS {
                    return Err(diesel::r2d2::Error::ConnectionError(
                        diesel::ConnectionError::BadConnection(format!(
                            "no connection after {} attempts: {}",
                            attempts, e
                        )),
                    ));
                }
                std::thread::sleep(Duration::from_millis(10 * (1 << (attempts - 1))));
            }
        }
    }
}
