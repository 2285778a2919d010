// External crate imports
use anyhow::{Context, Result};
use aws_sdk_dynamodb::{
    error::SdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient,
};

/// Physical table names, all sharing one configurable prefix.
#[derive(Debug, Clone)]
pub struct TableNames {
    pub users: String,
    pub communities: String,
    pub memes: String,
    pub templates: String,
    pub favourites: String,
    pub votes: String,
    /// Case-insensitive uniqueness guards (`meme_link#...`, `community_name#...`).
    pub unique_keys: String,
    /// Sequential id allocation, one item per entity kind.
    pub counters: String,
}

impl TableNames {
    pub fn with_prefix(prefix: &str) -> Self {
        let name = |table: &str| format!("{}{}", prefix, table);
        Self {
            users: name("users"),
            communities: name("communities"),
            memes: name("memes"),
            templates: name("templates"),
            favourites: name("favourites"),
            votes: name("votes"),
            unique_keys: name("unique_keys"),
            counters: name("counters"),
        }
    }

    /// `(table, partition key attribute, key type)` for every table.
    pub fn key_schemas(&self) -> Vec<(&str, &'static str, ScalarAttributeType)> {
        vec![
            (self.users.as_str(), "user_id", ScalarAttributeType::N),
            (self.communities.as_str(), "community_id", ScalarAttributeType::N),
            (self.memes.as_str(), "meme_id", ScalarAttributeType::N),
            (self.templates.as_str(), "template_id", ScalarAttributeType::N),
            (self.favourites.as_str(), "favourite_key", ScalarAttributeType::S),
            (self.votes.as_str(), "vote_key", ScalarAttributeType::S),
            (self.unique_keys.as_str(), "unique_key", ScalarAttributeType::S),
            (self.counters.as_str(), "counter_name", ScalarAttributeType::S),
        ]
    }
}

/// Creates a single-key DynamoDB table, if it does not already exist.
///
/// The table uses `key_attribute` as the partition (hash) key and PayPerRequest billing.
pub async fn ensure_table(
    client: &DynamoDbClient,
    table: &str,
    key_attribute: &str,
    key_type: ScalarAttributeType,
) -> Result<()> {
    let result = client
        .create_table()
        .table_name(table)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(key_attribute)
                .attribute_type(key_type)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(key_attribute)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;

    match result {
        Ok(_) => {
            tracing::info!("Table '{}' created successfully.", table);
            Ok(())
        }
        Err(e) => {
            if let SdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Table '{}' already exists, no action needed.", table);
                    return Ok(());
                }
            }
            Err(anyhow::Error::new(e))
                .with_context(|| format!("Failed to create DynamoDB table '{}'", table))
        }
    }
}

/// Ensures every table in `names` exists.
pub async fn create_tables(client: &DynamoDbClient, names: &TableNames) -> Result<()> {
    for (table, key_attribute, key_type) in names.key_schemas() {
        ensure_table(client, table, key_attribute, key_type).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_carries_the_prefix() {
        let names = TableNames::with_prefix("test_");
        let schemas = names.key_schemas();
        assert_eq!(schemas.len(), 8);
        assert!(schemas.iter().all(|(table, _, _)| table.starts_with("test_")));
        assert_eq!(names.unique_keys, "test_unique_keys");
    }
}
