//! Resolution of the active request log for a unit of work.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::{Database, DatabaseConnection};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::log::{infer_application_name, RequestLog};
use crate::memory_log::{MemoryRequestLog, MemoryStore};
use crate::settings::{ConnectionSource, LogKind, LogSettings};
use crate::sql_log::SqlRequestLog;

/// One unit of work, typically one inbound HTTP request.
///
/// The active log is resolved on first use and reused for the rest of the unit.
#[derive(Debug)]
pub struct UnitOfWork {
    context: RequestContext,
    active_log: Option<Arc<dyn RequestLog>>,
}

impl UnitOfWork {
    pub fn new(context: RequestContext) -> Self {
        Self {
            context,
            active_log: None,
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    /// The log resolved for this unit, if any yet.
    pub fn active_log(&self) -> Option<&Arc<dyn RequestLog>> {
        self.active_log.as_ref()
    }
}

#[derive(Debug)]
enum Backend {
    Memory(Arc<MemoryStore>),
    Sql {
        url: String,
        conn: OnceCell<DatabaseConnection>,
    },
}

/// Builds the configured [`RequestLog`] once per [`UnitOfWork`].
///
/// The selector owns the process-wide resources: the shared [`MemoryStore`] or the
/// database connection pool, which is opened on first use. Configuration is read
/// once, when the selector is built.
///
/// Missing or malformed configuration is not an error: the selector falls back to
/// an in-memory log of default capacity and says so with a `warn!`. The fallback
/// shows in [`RequestLog::name`].
///
/// ```no_run
/// use std::collections::HashMap;
/// use request_log::{LogSelector, RequestContext, RequestLog, UnitOfWork};
///
/// # async fn example() -> request_log::Result<()> {
/// let config = HashMap::from([
///     ("type".to_string(), "sql".to_string()),
///     ("connectionStringAppKey".to_string(), "DATABASE_URL".to_string()),
/// ]);
/// let selector = LogSelector::new(&config);
///
/// let mut unit = UnitOfWork::new(RequestContext::new());
/// let log = selector.get_or_create_active_log(&mut unit).await?;
/// println!("logging to {}", log.name());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LogSelector {
    settings: LogSettings,
    backend: Backend,
    lock_timeout: Option<Duration>,
}

impl LogSelector {
    /// Builds a selector from a configuration section.
    pub fn new(config: &HashMap<String, String>) -> Self {
        Self::with_connection_strings(config, &HashMap::new())
    }

    /// Builds a selector, resolving `connectionStringName` against `connection_strings`.
    pub fn with_connection_strings(
        config: &HashMap<String, String>,
        connection_strings: &HashMap<String, String>,
    ) -> Self {
        let settings = if config.is_empty() {
            warn!("no request log configuration, using the in-memory log");
            LogSettings::default()
        } else {
            LogSettings::from_map(config).unwrap_or_else(|e| {
                warn!(error = %e, "invalid request log configuration, using the in-memory log");
                LogSettings::default()
            })
        };
        Self::from_settings(settings, connection_strings)
    }

    /// Builds a selector from already parsed settings.
    pub fn from_settings(
        mut settings: LogSettings,
        connection_strings: &HashMap<String, String>,
    ) -> Self {
        let backend = match settings.kind.clone() {
            LogKind::Memory { size } => {
                Backend::Memory(Arc::new(MemoryStore::new(size).unwrap_or_default()))
            }
            LogKind::Sql { connection } => match connection.resolve(connection_strings) {
                Some(url) if !url.is_empty() => Backend::Sql {
                    url,
                    conn: OnceCell::new(),
                },
                _ => {
                    warn!("request log connection string did not resolve, using the in-memory log");
                    settings.kind = LogKind::Memory {
                        size: MemoryStore::DEFAULT_SIZE,
                    };
                    Backend::Memory(Arc::new(MemoryStore::default()))
                }
            },
        };
        Self {
            settings,
            backend,
            lock_timeout: None,
        }
    }

    /// Uses an existing database connection instead of opening one.
    ///
    /// The settings then report a relational log over [`ConnectionSource::Provided`].
    pub fn with_database(mut self, conn: DatabaseConnection) -> Self {
        self.settings.kind = LogKind::Sql {
            connection: ConnectionSource::Provided,
        };
        self.backend = Backend::Sql {
            url: String::new(),
            conn: OnceCell::new_with(Some(conn)),
        };
        self
    }

    /// Uses a memory store shared with the rest of the application.
    ///
    /// The settings then report the capacity of that store.
    pub fn with_memory_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.settings.kind = LogKind::Memory {
            size: store.capacity(),
        };
        self.backend = Backend::Memory(store);
        self
    }

    /// Bounds lock waits of in-memory logs built by this selector.
    pub fn with_lock_timeout(mut self, deadline: Duration) -> Self {
        self.lock_timeout = Some(deadline);
        self
    }

    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    /// Returns the log of `unit`, building and caching it on first call.
    ///
    /// A freshly built log gets the configured application name or, failing that,
    /// one inferred from the unit's context.
    ///
    /// # Errors
    ///
    /// * [`Error::Backend`] if the database cannot be reached or migrated.
    /// * [`Error::InvalidArgument`] if the application name is too long for the store.
    pub async fn get_or_create_active_log(
        &self,
        unit: &mut UnitOfWork,
    ) -> Result<Arc<dyn RequestLog>> {
        if let Some(log) = &unit.active_log {
            return Ok(Arc::clone(log));
        }

        let log: Arc<dyn RequestLog> = match &self.backend {
            Backend::Memory(store) => {
                let log = MemoryRequestLog::new(Arc::clone(store));
                Arc::new(match self.lock_timeout {
                    Some(deadline) => log.with_lock_timeout(deadline),
                    None => log,
                })
            }
            Backend::Sql { url, conn } => {
                let conn = conn.get_or_try_init(|| self.connect(url)).await?;
                Arc::new(SqlRequestLog::new(conn.clone()))
            }
        };

        if log.application_name().is_empty() {
            let name = self
                .settings
                .application_name
                .clone()
                .unwrap_or_else(|| infer_application_name(&unit.context));
            log.set_application_name(&name)?;
        }

        info!(
            store = log.name(),
            application = log.application_name(),
            "request log selected"
        );
        unit.active_log = Some(Arc::clone(&log));
        Ok(log)
    }

    async fn connect(&self, url: &str) -> Result<DatabaseConnection> {
        let conn = Database::connect(url)
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;

        if self.settings.auto_migrate {
            #[cfg(feature = "migration")]
            {
                use sea_orm_migration::MigratorTrait;

                crate::migration::Migrator::up(&conn, None)
                    .await
                    .map_err(|e| Error::Backend(e.to_string()))?;
            }
            #[cfg(not(feature = "migration"))]
            {
                warn!("`autoMigrate` is set but the `migration` feature is disabled");
            }
        }
        Ok(conn)
    }
}
