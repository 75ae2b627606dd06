use crate::data_store::StoreError;
use crate::setup::SetupError;
use std::path::PathBuf;

/// Reasons for an `eventease` command (`serve`, `migrate-db`, `list-bookings`) to end with a
/// failure. Each kind of failure has its own process exit code, see [CliError::exit_code].
#[derive(Debug)]
pub enum CliError {
    /// A required environment variable is missing or malformed
    SetupError(String),
    /// The PostgreSQL server cannot be reached or refused the connection
    DatabaseUnavailable(String),
    /// A database query failed, e.g. while listing the bookings
    StoreFault(String),
    /// `serve` could not bind the configured listen address
    BindError(std::io::Error),
    /// The web server stopped with an io error
    ServerError(std::io::Error),
    /// `migrate-db` could not apply the schema migrations
    DatabaseMigrationError(String),
    /// `serve` refuses to start before `migrate-db` has been run
    DatabaseMigrationRequired {
        /// The names of the pending database schema migrations
        missing_migrations: Vec<String>,
    },
    /// The directory for uploaded venue images cannot be created
    ImageDirectoryError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::SetupError(_) | CliError::ImageDirectoryError { .. } => 1,
            CliError::StoreFault(_) => 2,
            CliError::BindError(_) | CliError::ServerError(_) => 3,
            CliError::DatabaseUnavailable(_) | CliError::DatabaseMigrationError(_) => 4,
            CliError::DatabaseMigrationRequired { .. } => 5,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::SetupError(e) => write!(f, "Setup invalid: {}", e),
            CliError::DatabaseUnavailable(e) => write!(f, "Database not available: {}", e),
            CliError::StoreFault(e) => write!(f, "Database query failed: {}", e),
            CliError::BindError(e) => write!(f, "Could not bind listen address: {}", e),
            CliError::ServerError(e) => write!(f, "Web server failed: {}", e),
            CliError::DatabaseMigrationError(e) => {
                write!(f, "Could not migrate the database schema: {}", e)
            }
            CliError::DatabaseMigrationRequired { missing_migrations } => write!(
                f,
                "Database schema is outdated, run `eventease migrate-db` first. Pending \
                migrations: {}",
                missing_migrations.join(", ")
            ),
            CliError::ImageDirectoryError { path, error } => write!(
                f,
                "Image directory {} is not usable: {}",
                path.display(),
                error
            ),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(e) => Self::DatabaseUnavailable(e),
            e => Self::StoreFault(e.to_string()),
        }
    }
}

impl From<SetupError> for CliError {
    fn from(value: SetupError) -> Self {
        Self::SetupError(value.to_string())
    }
}

impl From<diesel::ConnectionError> for CliError {
    fn from(value: diesel::ConnectionError) -> Self {
        Self::DatabaseUnavailable(value.to_string())
    }
}
