use crate::{
    db::TableNames,
    domain::{
        CommunityRepository, FavouriteRepository, MemeRepository, SharedClock, TemplateRepository,
        UserRepository, VoteRepository,
    },
    errors::RepoError,
    models::{
        Community, CommunityId, Meme, MemeId, NewCommunity, NewMeme, NewTemplate, NewUser,
        Template, TemplateId, User, UserId, VoteDirection,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    operation::transact_write_items::TransactWriteItemsError,
    types::{AttributeValue, ConditionCheck, Delete, Put, ReturnValue, TransactWriteItem, Update},
    Client as DynamoDbClient,
};
use aws_smithy_types::error::operation::BuildError;
use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::{collections::HashMap, time::Duration};

type Item = HashMap<String, AttributeValue>;

const CONDITION_FAILED: &str = "ConditionalCheckFailed";

/// Result of a `TransactWriteItems` call that reached DynamoDB.
enum TxOutcome {
    Committed,
    /// One cancellation code per transaction item, in item order.
    Cancelled(Vec<String>),
}

impl TxOutcome {
    fn failed_condition(&self, index: usize) -> bool {
        match self {
            TxOutcome::Committed => false,
            TxOutcome::Cancelled(codes) => codes.get(index).is_some_and(|c| c == CONDITION_FAILED),
        }
    }
}

#[derive(Clone)]
pub struct DynamoDbStore {
    client: DynamoDbClient,
    tables: TableNames,
    clock: SharedClock,
}

impl DynamoDbStore {
    pub fn new(client: DynamoDbClient, tables: TableNames, clock: SharedClock) -> Self {
        tracing::info!(memes_table = %tables.memes, "Initializing DynamoDbStore");
        Self { client, tables, clock }
    }

    /// Allocates the next id for `counter` with an atomic `ADD`.
    async fn next_id(&self, counter: &str) -> Result<i64, RepoError> {
        let resp = self
            .client
            .update_item()
            .table_name(&self.tables.counters)
            .key("counter_name", AttributeValue::S(counter.to_string()))
            .update_expression("ADD #next :one")
            .expression_attribute_names("#next", "next_id")
            .expression_attribute_values(":one", num(1))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to allocate {} id", self.tables.counters, counter))
            .map_err(RepoError::BackendError)?;
        let attributes = resp
            .attributes
            .ok_or_else(|| RepoError::DataCorruption(format!("counter '{}' returned no value", counter)))?;
        read_n(&attributes, "next_id")
    }

    async fn get_item(&self, table: &str, key: &str, value: AttributeValue) -> Result<Option<Item>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(table)
            .key(key, value)
            .consistent_read(true)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get item", table))
            .map_err(RepoError::BackendError)?;
        Ok(resp.item)
    }

    /// Scans `table`, optionally keeping only items whose `community_id` equals `scope`.
    async fn scan_all(&self, table: &str, scope: Option<CommunityId>) -> Result<Vec<Item>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' (scope: {:?})", table, scope);
        let mut items = Vec::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(table).consistent_read(true);
            if let Some(community_id) = scope {
                request_builder = request_builder
                    .filter_expression("#community = :community")
                    .expression_attribute_names("#community", "community_id")
                    .expression_attribute_values(":community", num(community_id));
            }
            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", table))
                .map_err(RepoError::BackendError)?;

            items.extend(resp.items.unwrap_or_default());

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        tracing::debug!("DynamoDB (table: {}): Scan returned {} items", table, items.len());
        Ok(items)
    }

    async fn transact(&self, items: Vec<TransactWriteItem>, context: &str) -> Result<TxOutcome, RepoError> {
        match self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
        {
            Ok(_) => Ok(TxOutcome::Committed),
            Err(err) => {
                if let Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) =
                    err.as_service_error()
                {
                    let codes = cancelled
                        .cancellation_reasons()
                        .iter()
                        .map(|reason| reason.code().unwrap_or("None").to_string())
                        .collect::<Vec<_>>();
                    tracing::debug!(?codes, "DynamoDB: Transaction cancelled ({})", context);
                    return Ok(TxOutcome::Cancelled(codes));
                }
                Err(RepoError::BackendError(
                    anyhow::Error::new(err).context(format!("DynamoDB: Transaction failed ({})", context)),
                ))
            }
        }
    }

    /// Claims `unique_key` for `owner_id`; fails the transaction if already claimed.
    fn claim_unique_key(&self, unique_key: String, owner_id: i64) -> Result<TransactWriteItem, RepoError> {
        let put = Put::builder()
            .table_name(&self.tables.unique_keys)
            .item("unique_key", AttributeValue::S(unique_key))
            .item("owner_id", num(owner_id))
            .condition_expression("attribute_not_exists(#key)")
            .expression_attribute_names("#key", "unique_key")
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn put_new(&self, table: &str, key_attribute: &str, item: Item) -> Result<TransactWriteItem, RepoError> {
        let put = Put::builder()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#key)")
            .expression_attribute_names("#key", key_attribute)
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn require_exists(&self, table: &str, key_attribute: &str, id: i64) -> Result<TransactWriteItem, RepoError> {
        let check = ConditionCheck::builder()
            .table_name(table)
            .key(key_attribute, num(id))
            .condition_expression("attribute_exists(#key)")
            .expression_attribute_names("#key", key_attribute)
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().condition_check(check).build())
    }

    /// `ADD delta` to a counter attribute of an existing item.
    fn add_to_counter(
        &self,
        table: &str,
        key_attribute: &str,
        id: i64,
        counter: &str,
        delta: i64,
    ) -> Result<TransactWriteItem, RepoError> {
        let update = Update::builder()
            .table_name(table)
            .key(key_attribute, num(id))
            .update_expression("ADD #counter :delta")
            .condition_expression("attribute_exists(#key)")
            .expression_attribute_names("#counter", counter)
            .expression_attribute_names("#key", key_attribute)
            .expression_attribute_values(":delta", num(delta))
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().update(update).build())
    }

    async fn load_community(&self, id: CommunityId) -> Result<Option<Community>, RepoError> {
        self.get_item(&self.tables.communities, "community_id", num(id))
            .await?
            .map(|item| item_to_community(&item))
            .transpose()
    }

    async fn load_meme(&self, id: MemeId) -> Result<Option<Meme>, RepoError> {
        self.get_item(&self.tables.memes, "meme_id", num(id))
            .await?
            .map(|item| item_to_meme(&item))
            .transpose()
    }

    async fn load_vote_weight(&self, vote_key: &str) -> Result<i64, RepoError> {
        match self
            .get_item(&self.tables.votes, "vote_key", AttributeValue::S(vote_key.to_string()))
            .await?
        {
            Some(item) => read_n(&item, "weight"),
            None => Ok(0),
        }
    }

    /// One optimistic attempt: the vote row is written only if it still holds
    /// the weight we read, otherwise `RepoError::Contention`.
    async fn try_apply_vote(
        &self,
        meme_id: MemeId,
        user_id: UserId,
        direction: VoteDirection,
    ) -> Result<i64, RepoError> {
        let vote_key = format!("{}#{}", meme_id, user_id);
        let previous = self.load_vote_weight(&vote_key).await?;
        let delta = direction.weight() - previous;
        if delta == 0 {
            return self
                .load_meme(meme_id)
                .await?
                .map(|meme| meme.net_vote)
                .ok_or(RepoError::NotFound { resource: "meme" });
        }

        let vote_write = if direction == VoteDirection::None {
            let delete = Delete::builder()
                .table_name(&self.tables.votes)
                .key("vote_key", AttributeValue::S(vote_key.clone()))
                .condition_expression("#weight = :previous")
                .expression_attribute_names("#weight", "weight")
                .expression_attribute_values(":previous", num(previous))
                .build()
                .map_err(build_error)?;
            TransactWriteItem::builder().delete(delete).build()
        } else {
            let mut put = Put::builder()
                .table_name(&self.tables.votes)
                .item("vote_key", AttributeValue::S(vote_key.clone()))
                .item("meme_id", num(meme_id))
                .item("user_id", num(user_id))
                .item("weight", num(direction.weight()));
            put = if previous == 0 {
                put.condition_expression("attribute_not_exists(#key)")
                    .expression_attribute_names("#key", "vote_key")
            } else {
                put.condition_expression("#weight = :previous")
                    .expression_attribute_names("#weight", "weight")
                    .expression_attribute_values(":previous", num(previous))
            };
            TransactWriteItem::builder().put(put.build().map_err(build_error)?).build()
        };
        let score_write = self.add_to_counter(&self.tables.memes, "meme_id", meme_id, "net_vote", delta)?;

        match self.transact(vec![vote_write, score_write], "apply vote").await? {
            TxOutcome::Committed => {}
            outcome if outcome.failed_condition(1) => return Err(RepoError::NotFound { resource: "meme" }),
            TxOutcome::Cancelled(_) => return Err(RepoError::Contention),
        }

        self.load_meme(meme_id)
            .await?
            .map(|meme| meme.net_vote)
            .ok_or(RepoError::NotFound { resource: "meme" })
    }
}

#[async_trait]
impl UserRepository for DynamoDbStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let user = User {
            id: self.next_id("users").await?,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: self.clock.utc(),
        };
        self.client
            .put_item()
            .table_name(&self.tables.users)
            .item("user_id", num(user.id))
            .item("username", AttributeValue::S(user.username.clone()))
            .item("email", AttributeValue::S(user.email.clone()))
            .item("password_hash", AttributeValue::S(user.password_hash.clone()))
            .item("created_at", num(user.created_at.timestamp_millis()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put user (id: {})", self.tables.users, user.id))
            .map_err(RepoError::BackendError)?;
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        self.get_item(&self.tables.users, "user_id", num(id))
            .await?
            .map(|item| item_to_user(&item))
            .transpose()
    }
}

#[async_trait]
impl CommunityRepository for DynamoDbStore {
    async fn create_community(&self, community: NewCommunity) -> Result<Community, RepoError> {
        let community = Community {
            id: self.next_id("communities").await?,
            name: community.name,
            title: community.title,
            description: community.description,
            sidebar: community.sidebar,
            nsfw: community.nsfw,
            creator_id: community.creator_id,
            favourites_count: 0,
            created_at: self.clock.utc(),
        };
        let items = vec![
            self.claim_unique_key(community_name_key(&community.name), community.id)?,
            self.put_new(&self.tables.communities, "community_id", community_to_item(&community))?,
        ];
        match self.transact(items, "create community").await? {
            TxOutcome::Committed => {
                tracing::info!(community_id = community.id, name = %community.name, "DynamoDB: Community created");
                Ok(community)
            }
            outcome if outcome.failed_condition(0) => {
                Err(RepoError::Conflict { resource: "community", field: "name" })
            }
            TxOutcome::Cancelled(_) => Err(RepoError::Contention),
        }
    }

    async fn find_community_by_name(&self, name: &str) -> Result<Option<Community>, RepoError> {
        let guard = self
            .get_item(&self.tables.unique_keys, "unique_key", AttributeValue::S(community_name_key(name)))
            .await?;
        match guard {
            Some(item) => self.load_community(read_n(&item, "owner_id")?).await,
            None => Ok(None),
        }
    }

    async fn list_communities(&self) -> Result<Vec<Community>, RepoError> {
        self.scan_all(&self.tables.communities, None)
            .await?
            .iter()
            .map(item_to_community)
            .collect()
    }
}

#[async_trait]
impl MemeRepository for DynamoDbStore {
    async fn create_meme(&self, meme: NewMeme) -> Result<Meme, RepoError> {
        let created = Meme {
            id: self.next_id("memes").await?,
            title: meme.title,
            link: meme.link,
            net_vote: 0,
            creator_id: meme.creator_id,
            template_id: meme.template_id,
            community_id: meme.community_id,
            created_at: self.clock.utc(),
        };

        let mut items = vec![
            self.claim_unique_key(meme_link_key(&meme.canonical_link), created.id)?,
            self.put_new(&self.tables.memes, "meme_id", meme_to_item(&created))?,
        ];
        let community_index = created.community_id.map(|_| items.len());
        if let Some(community_id) = created.community_id {
            items.push(self.require_exists(&self.tables.communities, "community_id", community_id)?);
        }
        let template_index = created.template_id.map(|_| items.len());
        if let Some(template_id) = created.template_id {
            items.push(self.add_to_counter(&self.tables.templates, "template_id", template_id, "usage_count", 1)?);
        }

        let outcome = self.transact(items, "create meme").await?;
        if let TxOutcome::Committed = outcome {
            tracing::info!(meme_id = created.id, "DynamoDB: Meme created");
            return Ok(created);
        }
        if outcome.failed_condition(0) {
            return Err(RepoError::Conflict { resource: "meme", field: "link" });
        }
        if community_index.is_some_and(|i| outcome.failed_condition(i)) {
            return Err(RepoError::NotFound { resource: "community" });
        }
        if template_index.is_some_and(|i| outcome.failed_condition(i)) {
            return Err(RepoError::NotFound { resource: "template" });
        }
        Err(RepoError::Contention)
    }

    async fn canonical_link_exists(&self, canonical_link: &str) -> Result<bool, RepoError> {
        let guard = self
            .get_item(&self.tables.unique_keys, "unique_key", AttributeValue::S(meme_link_key(canonical_link)))
            .await?;
        Ok(guard.is_some())
    }

    async fn get_meme(&self, id: MemeId) -> Result<Option<Meme>, RepoError> {
        self.load_meme(id).await
    }

    async fn list_memes(&self, scope: Option<CommunityId>) -> Result<Vec<Meme>, RepoError> {
        self.scan_all(&self.tables.memes, scope)
            .await?
            .iter()
            .map(item_to_meme)
            .collect()
    }
}

#[async_trait]
impl TemplateRepository for DynamoDbStore {
    async fn create_template(&self, template: NewTemplate) -> Result<Template, RepoError> {
        let template = Template {
            id: self.next_id("templates").await?,
            name: template.name,
            community_id: template.community_id,
            usage_count: 0,
            created_at: self.clock.utc(),
        };
        let mut items = vec![self.put_new(&self.tables.templates, "template_id", template_to_item(&template))?];
        if let Some(community_id) = template.community_id {
            items.push(self.require_exists(&self.tables.communities, "community_id", community_id)?);
        }
        match self.transact(items, "create template").await? {
            TxOutcome::Committed => Ok(template),
            outcome if outcome.failed_condition(1) => Err(RepoError::NotFound { resource: "community" }),
            TxOutcome::Cancelled(_) => Err(RepoError::Contention),
        }
    }

    async fn get_template(&self, id: TemplateId) -> Result<Option<Template>, RepoError> {
        self.get_item(&self.tables.templates, "template_id", num(id))
            .await?
            .map(|item| item_to_template(&item))
            .transpose()
    }

    async fn list_templates(&self, scope: Option<CommunityId>) -> Result<Vec<Template>, RepoError> {
        self.scan_all(&self.tables.templates, scope)
            .await?
            .iter()
            .map(item_to_template)
            .collect()
    }
}

#[async_trait]
impl FavouriteRepository for DynamoDbStore {
    async fn add_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError> {
        let mut row = Item::new();
        row.insert("favourite_key".to_string(), AttributeValue::S(favourite_key(user_id, community_id)));
        row.insert("user_id".to_string(), num(user_id));
        row.insert("community_id".to_string(), num(community_id));
        let items = vec![
            self.put_new(&self.tables.favourites, "favourite_key", row)?,
            self.add_to_counter(&self.tables.communities, "community_id", community_id, "favourites_count", 1)?,
        ];
        match self.transact(items, "add favourite").await? {
            TxOutcome::Committed => Ok(true),
            outcome if outcome.failed_condition(1) => Err(RepoError::NotFound { resource: "community" }),
            outcome if outcome.failed_condition(0) => Ok(false),
            TxOutcome::Cancelled(_) => Err(RepoError::Contention),
        }
    }

    async fn remove_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError> {
        let delete = Delete::builder()
            .table_name(&self.tables.favourites)
            .key("favourite_key", AttributeValue::S(favourite_key(user_id, community_id)))
            .condition_expression("attribute_exists(#key)")
            .expression_attribute_names("#key", "favourite_key")
            .build()
            .map_err(build_error)?;
        let items = vec![
            TransactWriteItem::builder().delete(delete).build(),
            self.add_to_counter(&self.tables.communities, "community_id", community_id, "favourites_count", -1)?,
        ];
        match self.transact(items, "remove favourite").await? {
            TxOutcome::Committed => Ok(true),
            outcome if outcome.failed_condition(1) => Err(RepoError::NotFound { resource: "community" }),
            outcome if outcome.failed_condition(0) => Ok(false),
            TxOutcome::Cancelled(_) => Err(RepoError::Contention),
        }
    }

    async fn is_favourite(&self, user_id: UserId, community_id: CommunityId) -> Result<bool, RepoError> {
        let row = self
            .get_item(
                &self.tables.favourites,
                "favourite_key",
                AttributeValue::S(favourite_key(user_id, community_id)),
            )
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl VoteRepository for DynamoDbStore {
    async fn apply_vote(
        &self,
        meme_id: MemeId,
        user_id: UserId,
        direction: VoteDirection,
    ) -> Result<i64, RepoError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(10))
            .with_max_elapsed_time(Some(Duration::from_secs(2)))
            .build();
        let this = self;
        backoff::future::retry(policy, move || async move {
            this.try_apply_vote(meme_id, user_id, direction)
                .await
                .map_err(|e| match e {
                    RepoError::Contention => {
                        tracing::debug!(meme_id, user_id, "DynamoDB: Vote contended, retrying");
                        backoff::Error::transient(e)
                    }
                    other => backoff::Error::permanent(other),
                })
        })
        .await
    }

    async fn current_vote(&self, meme_id: MemeId, user_id: UserId) -> Result<VoteDirection, RepoError> {
        let weight = self.load_vote_weight(&format!("{}#{}", meme_id, user_id)).await?;
        VoteDirection::from_weight(weight)
            .ok_or_else(|| RepoError::DataCorruption(format!("vote weight {} out of range", weight)))
    }
}

// --- Key and item helpers ---

fn community_name_key(name: &str) -> String {
    format!("community_name#{}", name.to_lowercase())
}

fn meme_link_key(canonical_link: &str) -> String {
    format!("meme_link#{}", canonical_link)
}

fn favourite_key(user_id: UserId, community_id: CommunityId) -> String {
    format!("{}#{}", user_id, community_id)
}

fn num(value: i64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

fn build_error(err: BuildError) -> RepoError {
    RepoError::BackendError(anyhow::Error::new(err).context("Failed to build DynamoDB request"))
}

fn read_n(item: &Item, key: &str) -> Result<i64, RepoError> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| RepoError::DataCorruption(format!("missing or invalid number '{}'", key)))
}

fn read_opt_n(item: &Item, key: &str) -> Result<Option<i64>, RepoError> {
    match item.get(key) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(_) => read_n(item, key).map(Some),
    }
}

fn read_s(item: &Item, key: &str) -> Result<String, RepoError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepoError::DataCorruption(format!("missing or invalid string '{}'", key)))
}

fn read_bool(item: &Item, key: &str) -> Result<bool, RepoError> {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .ok_or_else(|| RepoError::DataCorruption(format!("missing or invalid bool '{}'", key)))
}

fn read_time(item: &Item, key: &str) -> Result<DateTime<Utc>, RepoError> {
    let millis = read_n(item, key)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| RepoError::DataCorruption(format!("timestamp '{}' out of range", key)))
}

fn item_to_user(item: &Item) -> Result<User, RepoError> {
    Ok(User {
        id: read_n(item, "user_id")?,
        username: read_s(item, "username")?,
        email: read_s(item, "email")?,
        password_hash: read_s(item, "password_hash")?,
        created_at: read_time(item, "created_at")?,
    })
}

fn community_to_item(community: &Community) -> Item {
    HashMap::from([
        ("community_id".to_string(), num(community.id)),
        ("name".to_string(), AttributeValue::S(community.name.clone())),
        ("title".to_string(), AttributeValue::S(community.title.clone())),
        ("description".to_string(), AttributeValue::S(community.description.clone())),
        ("sidebar".to_string(), AttributeValue::S(community.sidebar.clone())),
        ("nsfw".to_string(), AttributeValue::Bool(community.nsfw)),
        ("creator_id".to_string(), num(community.creator_id)),
        ("favourites_count".to_string(), num(community.favourites_count)),
        ("created_at".to_string(), num(community.created_at.timestamp_millis())),
    ])
}

fn item_to_community(item: &Item) -> Result<Community, RepoError> {
    Ok(Community {
        id: read_n(item, "community_id")?,
        name: read_s(item, "name")?,
        title: read_s(item, "title")?,
        description: read_s(item, "description")?,
        sidebar: read_s(item, "sidebar")?,
        nsfw: read_bool(item, "nsfw")?,
        creator_id: read_n(item, "creator_id")?,
        favourites_count: read_n(item, "favourites_count")?,
        created_at: read_time(item, "created_at")?,
    })
}

fn meme_to_item(meme: &Meme) -> Item {
    let mut item = HashMap::from([
        ("meme_id".to_string(), num(meme.id)),
        ("title".to_string(), AttributeValue::S(meme.title.clone())),
        ("link".to_string(), AttributeValue::S(meme.link.clone())),
        ("net_vote".to_string(), num(meme.net_vote)),
        ("creator_id".to_string(), num(meme.creator_id)),
        ("created_at".to_string(), num(meme.created_at.timestamp_millis())),
    ]);
    if let Some(template_id) = meme.template_id {
        item.insert("template_id".to_string(), num(template_id));
    }
    if let Some(community_id) = meme.community_id {
        item.insert("community_id".to_string(), num(community_id));
    }
    item
}

fn item_to_meme(item: &Item) -> Result<Meme, RepoError> {
    Ok(Meme {
        id: read_n(item, "meme_id")?,
        title: read_s(item, "title")?,
        link: read_s(item, "link")?,
        net_vote: read_n(item, "net_vote")?,
        creator_id: read_n(item, "creator_id")?,
        template_id: read_opt_n(item, "template_id")?,
        community_id: read_opt_n(item, "community_id")?,
        created_at: read_time(item, "created_at")?,
    })
}

fn template_to_item(template: &Template) -> Item {
    let mut item = HashMap::from([
        ("template_id".to_string(), num(template.id)),
        ("name".to_string(), AttributeValue::S(template.name.clone())),
        ("usage_count".to_string(), num(template.usage_count)),
        ("created_at".to_string(), num(template.created_at.timestamp_millis())),
    ]);
    if let Some(community_id) = template.community_id {
        item.insert("community_id".to_string(), num(community_id));
    }
    item
}

fn item_to_template(item: &Item) -> Result<Template, RepoError> {
    Ok(Template {
        id: read_n(item, "template_id")?,
        name: read_s(item, "name")?,
        community_id: read_opt_n(item, "community_id")?,
        usage_count: read_n(item, "usage_count")?,
        created_at: read_time(item, "created_at")?,
    })
}
