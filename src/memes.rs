use crate::domain::{MemeRepository, TemplateRepository};
use crate::errors::ServiceError;
use crate::feed::FeedEngine;
use crate::links::LinkGuard;
use crate::models::{Meme, MemeId, NewMeme, TemplateId, UserId};
use crate::store::StoreHandle;
use serde::Deserialize;

/// Body of `POST /memes`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeme {
    pub title: Option<String>,
    pub link: Option<String>,
    pub template_id: Option<TemplateId>,
    /// Community name, matched case-insensitively.
    pub community: Option<String>,
}

/// Meme creation and lookup.
#[derive(Clone)]
pub struct MemeCatalog {
    store: StoreHandle,
    links: LinkGuard,
    feed: FeedEngine,
}

impl MemeCatalog {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            links: LinkGuard::new(store.clone()),
            feed: FeedEngine::new(store.clone()),
            store,
        }
    }

    /// Validates, resolves references, then inserts under the store's link
    /// guard. A race lost at insert time yields the same conflict as the
    /// up-front check.
    pub async fn create(&self, creator_id: UserId, request: CreateMeme) -> Result<Meme, ServiceError> {
        let link = self.links.validate(request.link.as_deref().unwrap_or_default()).await?;
        let community_id = self
            .feed
            .resolve_scope(request.community.as_deref())
            .await?
            .map(|c| c.id);
        if let Some(template_id) = request.template_id {
            self.store
                .call("create the meme", self.store.store().get_template(template_id))
                .await?
                .ok_or(ServiceError::NotFound { resource: "template" })?;
        }

        let meme = NewMeme {
            title: request.title.unwrap_or_default(),
            link: link.original,
            canonical_link: link.canonical,
            creator_id,
            template_id: request.template_id,
            community_id,
        };
        let created = self
            .store
            .call("create the meme", self.store.store().create_meme(meme))
            .await?;
        tracing::info!(meme_id = created.id, ?community_id, creator_id, "Meme created");
        Ok(created)
    }

    pub async fn get(&self, id: MemeId) -> Result<Meme, ServiceError> {
        self.store
            .call("read the meme", self.store.store().get_meme(id))
            .await?
            .ok_or(ServiceError::NotFound { resource: "meme" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommunityRepository, TemplateRepository};
    use crate::models::NewTemplate;
    use crate::test_support::{new_community, seeded_handle};
    use std::sync::Arc;

    fn request(link: &str) -> CreateMeme {
        CreateMeme {
            title: Some("title".into()),
            link: Some(link.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn links_differing_only_by_case_conflict() {
        let (handle, _) = seeded_handle();
        let catalog = MemeCatalog::new(handle);
        let first = catalog.create(1, request("https://Example.com/Cat.png")).await.unwrap();
        assert_eq!(first.link, "https://Example.com/Cat.png");
        assert_eq!(first.net_vote, 0);

        let err = catalog.create(2, request("HTTPS://EXAMPLE.COM/CAT.PNG")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { resource: "meme", field: "link" }));
    }

    #[tokio::test]
    async fn racing_creators_get_one_meme_and_conflicts() {
        let (handle, store) = seeded_handle();
        let catalog = Arc::new(MemeCatalog::new(handle));
        let tasks: Vec<_> = ["https://x.io/Race", "https://x.io/race", "https://X.IO/RACE", "https://x.io/rAcE"]
            .into_iter()
            .map(|link| {
                let catalog = catalog.clone();
                tokio::spawn(async move { catalog.create(1, request(link)).await })
            })
            .collect();
        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(ServiceError::Conflict { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_memes(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_and_malformed_links_are_rejected() {
        let (handle, _) = seeded_handle();
        let catalog = MemeCatalog::new(handle);
        let err = catalog.create(1, CreateMeme::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "link", reason: "empty" }));
        let err = catalog.create(1, request("nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "link", reason: "malformed" }));
    }

    #[tokio::test]
    async fn unknown_community_or_template_is_not_found() {
        let (handle, _) = seeded_handle();
        let catalog = MemeCatalog::new(handle);
        let mut with_community = request("https://x.io/1");
        with_community.community = Some("nowhere".into());
        let err = catalog.create(1, with_community).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { resource: "community" }));

        let mut with_template = request("https://x.io/2");
        with_template.template_id = Some(31);
        let err = catalog.create(1, with_template).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { resource: "template" }));
    }

    #[tokio::test]
    async fn scoped_meme_counts_towards_its_template() {
        let (handle, store) = seeded_handle();
        let community = store.create_community(new_community("gaming")).await.unwrap();
        let template = store
            .create_template(NewTemplate { name: "drake".into(), community_id: Some(community.id) })
            .await
            .unwrap();
        let catalog = MemeCatalog::new(handle);
        let mut meme = request("https://x.io/drake");
        meme.community = Some("Gaming".into());
        meme.template_id = Some(template.id);

        let created = catalog.create(1, meme).await.unwrap();
        assert_eq!(created.community_id, Some(community.id));
        assert_eq!(store.get_template(template.id).await.unwrap().unwrap().usage_count, 1);
        assert_eq!(catalog.get(created.id).await.unwrap(), created);
    }
}
