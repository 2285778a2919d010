use crate::{
    aws_clients::{create_dynamodb_client, create_sdk_config},
    config::{Config, StoreBackend},
    db::{create_tables, TableNames},
    domain::EntityStore,
    errors::AppError,
    repositories::{DynamoDbStore, MemoryStore},
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use backoff::ExponentialBackoffBuilder;
use mockable::DefaultClock;
use std::{sync::Arc, time::Duration};

/// Creates the DynamoDB tables, retrying while the endpoint comes up
/// (LocalStack is often still starting when the server boots).
async fn init_tables(client: &DynamoDbClient, tables: &TableNames) -> Result<(), AppError> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(250))
        .with_max_elapsed_time(Some(Duration::from_secs(30)))
        .build();
    backoff::future::retry(policy, || async {
        create_tables(client, tables).await.map_err(|e| {
            tracing::warn!("Startup: Table creation failed, will retry: {:#}", e);
            backoff::Error::transient(e)
        })
    })
    .await
    .map_err(|e| {
        tracing::error!("Startup: Giving up on DynamoDB table creation: {:#}", e);
        AppError::InitError(format!("Failed to create DynamoDB tables: {:#}", e))
    })
}

/// Builds the entity store selected by `config`, initializing its resources.
pub async fn init_store(config: &Config) -> Result<Arc<dyn EntityStore>, AppError> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Startup: Using the in-memory store, data will not survive a restart.");
            Ok(Arc::new(MemoryStore::default()))
        }
        StoreBackend::DynamoDb => {
            tracing::info!("Startup: Initializing AWS DynamoDB client...");
            let sdk_config = create_sdk_config(config).await;
            let client = create_dynamodb_client(&sdk_config);
            let tables = TableNames::with_prefix(&config.table_prefix);
            init_tables(&client, &tables).await?;
            tracing::info!("Startup: AWS resource initialization complete.");
            Ok(Arc::new(DynamoDbStore::new(client, tables, Arc::new(DefaultClock))))
        }
    }
}
