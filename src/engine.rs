//! The declaration-and-reconciliation facade: the one type an external
//! caller holds.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use prax_migrate::config::MigrationConfig;
use prax_migrate::reconciler::Reconciler;
use prax_migrate::session::PgSession;
use prax_postgres::{PgConfig, PgPool, PgTransaction};
use prax_schema::{EnumRegistry, ModelConfig, ModelRuntime};

use crate::error::{EngineError, EngineResult};

/// One enum to register via [`Engine::enums`].
#[derive(Debug, Clone)]
pub struct EnumDeclaration {
    /// Enum name, as declared.
    pub name: String,
    /// Ordered value list, as declared.
    pub values: Vec<String>,
}

impl EnumDeclaration {
    /// Construct a declaration from a name and value list.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Options for [`Engine::migrate`].
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Destructive pre-pass, same effect as `reset`. Accepted as a
    /// separate flag to match the declaration API's `{clean?, reset?}`
    /// shape; either one triggers the same reset pre-pass.
    pub clean: bool,
    /// Destructive pre-pass: drop all extensions/tables/enum types
    /// before reconciling.
    pub reset: bool,
}

/// Options for [`Engine::transaction`].
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    /// `lock_timeout` for the transaction. Defaults to 2 seconds.
    pub lock_timeout: Option<Duration>,
    /// `statement_timeout` for the transaction. Defaults to 5 seconds.
    pub statement_timeout: Option<Duration>,
}

/// Process-local cache of engines, keyed by connection string, so
/// repeated [`Engine::init`] calls against the same database are
/// idempotent and return the same pool.
static INSTANCES: OnceLock<Mutex<HashMap<String, Arc<Engine>>>> = OnceLock::new();

fn instances() -> &'static Mutex<HashMap<String, Arc<Engine>>> {
    INSTANCES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A live handle to one database: a connection pool, the declared
/// enum registry and model list, and a reconciler to drive them against
/// the pool.
pub struct Engine {
    pool: PgPool,
    enums: Mutex<EnumRegistry>,
    models: Mutex<Vec<ModelConfig>>,
    reconciler: Reconciler,
}

impl Engine {
    /// Idempotently open a pool to `connection_string`'s database,
    /// creating it first if it does not exist. Repeated calls with the
    /// same connection string return the cached instance rather than
    /// opening a second pool.
    pub async fn init(connection_string: &str) -> EngineResult<Arc<Self>> {
        if let Some(existing) = instances().lock().unwrap().get(connection_string) {
            return Ok(existing.clone());
        }

        let config = PgConfig::from_url(connection_string)?;
        Self::ensure_database(&config).await?;

        let pool = PgPool::new(config).await?;
        let engine = Arc::new(Self {
            pool,
            enums: Mutex::new(EnumRegistry::new()),
            models: Mutex::new(Vec::new()),
            reconciler: Reconciler::new(),
        });

        instances()
            .lock()
            .unwrap()
            .insert(connection_string.to_string(), engine.clone());
        Ok(engine)
    }

    /// `CREATE DATABASE` against the target name, over a connection to
    /// Postgres's own `postgres` maintenance database (the target
    /// database cannot be connected to before it exists). Swallows the
    /// duplicate-database error; `CREATE DATABASE` has no `IF NOT
    /// EXISTS` form.
    async fn ensure_database(config: &PgConfig) -> EngineResult<()> {
        let mut admin_config = config.clone();
        admin_config.database = "postgres".to_string();
        let admin_pool = PgPool::new(admin_config).await?;
        let conn = admin_pool.get().await?;

        let database = config.database.replace('"', "\"\"");
        match conn.execute(&format!("CREATE DATABASE \"{database}\""), &[]).await {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e.into()),
        }

        admin_pool.close();
        Ok(())
    }

    /// Register enums into this engine's registry. Fails on the first
    /// rejected declaration (a redefinition or a value-list collision);
    /// declarations before the failure remain registered.
    pub fn enums(&self, declarations: &[EnumDeclaration]) -> EngineResult<()> {
        let mut registry = self.enums.lock().unwrap();
        for declaration in declarations {
            registry.register(&declaration.name, &declaration.values)?;
        }
        Ok(())
    }

    /// Register a model declaration. Normalization and validation are
    /// deferred to [`Engine::migrate`], since a model may reference an
    /// enum registered after this call.
    pub fn model(&self, config: ModelConfig) {
        self.models.lock().unwrap().push(config);
    }

    /// Run `f` inside a transaction with `options`' timeouts applied via
    /// `SET LOCAL`. Commits on `Ok`, rolls back on `Err`.
    pub async fn transaction<F, Fut, T>(&self, options: TransactionOptions, f: F) -> EngineResult<T>
    where
        F: FnOnce(&PgTransaction<'_>) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let mut conn = self.pool.get().await?;
        let txn = conn.transaction().await?;

        let config = MigrationConfig::default()
            .lock_timeout(options.lock_timeout.unwrap_or(Duration::from_secs(2)))
            .statement_timeout(options.statement_timeout.unwrap_or(Duration::from_secs(5)));
        for statement in config.set_local_sql() {
            txn.execute(&statement, &[]).await?;
        }

        match f(&txn).await {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(e) => {
                let _ = txn.rollback().await;
                Err(e)
            }
        }
    }

    /// Reconcile every registered model and enum against the live
    /// database. Returns `false` if this call was refused because
    /// another `migrate` is already running on this engine (the
    /// transaction it opened is rolled back, untouched); returns `true`
    /// once the reconciliation transaction commits.
    pub async fn migrate(&self, options: MigrateOptions) -> EngineResult<bool> {
        let reset = options.reset || options.clean;
        let migration_config = MigrationConfig::new(reset);

        let mut conn = self.pool.get().await?;
        let txn = conn.transaction().await?;
        for statement in migration_config.set_local_sql() {
            txn.execute(&statement, &[]).await?;
        }

        let enums = self.enums.lock().unwrap().clone();
        let model_configs = self.models.lock().unwrap().clone();
        let models: Vec<ModelRuntime> = model_configs
            .iter()
            .map(|config| ModelRuntime::build(config, &enums))
            .collect();

        let session = PgSession::new(&txn);
        let result = self.reconciler.migrate(&session, &enums, &models, reset).await;

        match result {
            Ok(applied) => {
                if applied {
                    txn.commit().await?;
                } else {
                    txn.rollback().await?;
                }
                Ok(applied)
            }
            Err(e) => {
                let _ = txn.rollback().await;
                Err(EngineError::from(e))
            }
        }
    }
}
