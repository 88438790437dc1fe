use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use gcloud_gax::grpc::{Code, Status};
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert_or_update};
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use std::future::Future;
use std::sync::Arc;

use super::KvStore;
use crate::config::SpannerConfig;

const TABLE: &str = "kvman_records";

/// Key-value store backed by a Cloud Spanner table
#[derive(Clone)]
pub struct SpannerStore {
    inner: Arc<Client>,
}

impl SpannerStore {
    /// Connect to Spanner, provisioning the instance, database and table
    /// when they are missing.
    ///
    /// The gcloud-spanner library picks up `SPANNER_EMULATOR_HOST` from the
    /// environment and connects to the emulator when it is set.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        let paths = ResourcePaths::new(config);
        provision(config, &paths).await?;
        let database_path = paths.database;

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }
}

#[async_trait]
impl KvStore for SpannerStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut statement = Statement::new(format!(
            "SELECT value FROM {} WHERE name = @name",
            TABLE
        ));
        statement.add_param("name", &key.to_string());

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query value from Spanner")?;

        if let Some(row) = result_set.next().await? {
            let value: String = row.column_by_name("value")?;
            tracing::debug!("Read key: {}", key);
            Ok(Some(value))
        } else {
            tracing::debug!("Key not found: {}", key);
            Ok(None)
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let name = key.to_string();
        let value = value.to_string();

        let mutation = insert_or_update(
            TABLE,
            &["name", "value", "updated_at"],
            &[&name, &value, &CommitTimestamp::new()],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to write value to Spanner")?;

        tracing::debug!("Stored key: {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mutation = delete(TABLE, Key::new(&key.to_string()));

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to delete key from Spanner")?;

        tracing::debug!("Deleted key: {}", key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let statement = Statement::new(format!("SELECT name FROM {} ORDER BY name ASC", TABLE));

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction for key list")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to list keys from Spanner")?;

        let mut keys = Vec::new();
        while let Some(row) = result_set.next().await? {
            let name: String = row.column_by_name("name")?;
            keys.push(name);
        }

        tracing::debug!("Listed {} keys", keys.len());
        Ok(keys)
    }

    /// Lightweight `SELECT 1` round trip
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// DDL of the single table backing the store
const TABLE_DDL: &str = "CREATE TABLE kvman_records (
    name STRING(MAX) NOT NULL,
    value STRING(MAX) NOT NULL,
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (name)";

/// Fully qualified Spanner resource names derived from the config
#[derive(Debug, PartialEq)]
struct ResourcePaths {
    project: String,
    instance: String,
    database: String,
}

impl ResourcePaths {
    fn new(config: &SpannerConfig) -> Self {
        let project = format!("projects/{}", config.project);
        let instance = format!("{}/instances/{}", project, config.instance);
        let database = format!("{}/databases/{}", instance, config.database);
        Self {
            project,
            instance,
            database,
        }
    }

    /// The emulator only knows its own instance config
    fn instance_config(&self, config: &SpannerConfig) -> String {
        let name = if config.emulator_host.is_some() {
            "emulator-config"
        } else {
            "regional-us-central1"
        };
        format!("{}/instanceConfigs/{}", self.project, name)
    }
}

/// True when the schema already declares the store's table.
fn declares_table(statements: &[String]) -> bool {
    let plain = format!("CREATE TABLE {} ", TABLE);
    let quoted = format!("CREATE TABLE `{}`", TABLE);
    statements
        .iter()
        .any(|stmt| stmt.starts_with(&plain) || stmt.starts_with(&quoted))
}

/// Create whatever of instance, database and table is missing.
async fn provision(config: &SpannerConfig, paths: &ResourcePaths) -> Result<()> {
    let admin = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let instance = admin
        .instance()
        .get_instance(
            GetInstanceRequest {
                name: paths.instance.clone(),
                field_mask: None,
            },
            None,
        )
        .await
        .map(|_| ());
    get_or_create("instance", &paths.instance, instance, create_instance(&admin, config, paths))
        .await?;

    let database = admin
        .database()
        .get_database(
            GetDatabaseRequest {
                name: paths.database.clone(),
            },
            None,
        )
        .await
        .map(|_| ());
    get_or_create("database", &paths.database, database, create_database(&admin, config, paths))
        .await?;

    let ddl = admin
        .database()
        .get_database_ddl(
            GetDatabaseDdlRequest {
                database: paths.database.clone(),
            },
            None,
        )
        .await
        .context("Failed to read database schema")?
        .into_inner();
    if declares_table(&ddl.statements) {
        tracing::debug!("Table '{}' already exists", TABLE);
    } else {
        create_table(&admin, paths).await?;
    }

    Ok(())
}

/// Run `create` only when `lookup` came back NotFound.
///
/// `create` is a lazy future and is dropped unpolled when the resource exists.
async fn get_or_create(
    kind: &str,
    path: &str,
    lookup: std::result::Result<(), Status>,
    create: impl Future<Output = Result<()>>,
) -> Result<()> {
    match lookup {
        Ok(()) => {
            tracing::debug!("Spanner {} exists: {}", kind, path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Creating Spanner {}: {}", kind, path);
            create.await?;
            tracing::info!("Created Spanner {}: {}", kind, path);
            Ok(())
        }
        Err(status) => bail!("Failed to look up Spanner {} {}: {}", kind, path, status.message()),
    }
}

async fn create_instance(
    admin: &AdminClient,
    config: &SpannerConfig,
    paths: &ResourcePaths,
) -> Result<()> {
    let request = CreateInstanceRequest {
        parent: paths.project.clone(),
        instance_id: config.instance.clone(),
        instance: Some(Instance {
            name: paths.instance.clone(),
            config: paths.instance_config(config),
            display_name: format!("kvman {}", config.instance),
            node_count: 1,
            ..Default::default()
        }),
    };

    admin
        .instance()
        .create_instance(request, None)
        .await
        .context("Failed to start instance creation")?
        .wait(None)
        .await
        .context("Failed to create instance")?;
    Ok(())
}

async fn create_database(
    admin: &AdminClient,
    config: &SpannerConfig,
    paths: &ResourcePaths,
) -> Result<()> {
    let request = CreateDatabaseRequest {
        parent: paths.instance.clone(),
        create_statement: format!("CREATE DATABASE `{}`", config.database),
        // The table comes with the database so a fresh setup needs one DDL round
        extra_statements: vec![TABLE_DDL.to_string()],
        encryption_config: None,
        database_dialect: 1, // Google Standard SQL
        proto_descriptors: vec![],
    };

    admin
        .database()
        .create_database(request, None)
        .await
        .context("Failed to start database creation")?
        .wait(None)
        .await
        .context("Failed to create database")?;
    Ok(())
}

async fn create_table(admin: &AdminClient, paths: &ResourcePaths) -> Result<()> {
    tracing::info!("Creating table '{}'", TABLE);

    let request = UpdateDatabaseDdlRequest {
        database: paths.database.clone(),
        statements: vec![TABLE_DDL.to_string()],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    admin
        .database()
        .update_database_ddl(request, None)
        .await
        .context("Failed to start table creation")?
        .wait(None)
        .await
        .context("Failed to create table")?;
    Ok(())
}
