use crate::{
    auth::AuthUser,
    communities::{CommunityDetail, CreateCommunity},
    errors::{AppError, ServiceError},
    feed::{ListQuery, MemeSort, PageRequest, RankSort},
    memes::CreateMeme,
    models::{Community, Meme, MemeId, Template, VoteDirection},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityListing {
    pub communities: Vec<Community>,
    pub total_count: usize,
    pub offset: usize,
    pub size: usize,
    pub sort: RankSort,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeListing {
    pub memes: Vec<Meme>,
    pub total_count: usize,
    pub offset: usize,
    pub sort: MemeSort,
    pub size: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListing {
    pub templates: Vec<Template>,
    pub total_count: usize,
    pub offset: usize,
    pub size: usize,
    pub sort: RankSort,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Exists {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct FavouriteStatus {
    pub favourited: bool,
}

#[derive(Debug, Serialize)]
pub struct CurrentVote {
    pub direction: VoteDirection,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    pub net_vote: i64,
}

fn parse_meme_id(id_str: &str) -> Result<MemeId, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid meme ID format: {}", id_str)))
}

// --- Communities ---

pub async fn create_community(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateCommunity>, JsonRejection>,
) -> Result<Json<Community>, AppError> {
    let Json(request) = payload?;
    let community = state.communities.create(user_id, request).await?;
    Ok(Json(community))
}

pub async fn list_communities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<CommunityListing>, AppError> {
    let request = PageRequest::<RankSort>::from_query(&query);
    let page = state.feed.list_communities(request).await?;
    Ok(Json(CommunityListing {
        size: page.items.len(),
        communities: page.items,
        total_count: page.total_count,
        offset: request.offset,
        sort: request.sort,
    }))
}

pub async fn get_community(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<CommunityDetail>, AppError> {
    tracing::debug!(community = %name, "Fetching community details via handler");
    Ok(Json(state.communities.detail(&name).await?))
}

pub async fn favourite_community(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<Message>, AppError> {
    let community = state.communities.get(&name).await?;
    state.favourites.add_favourite(user_id, community.id).await?;
    Ok(Json(Message { message: "Successfully favourited the community" }))
}

pub async fn unfavourite_community(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<Message>, AppError> {
    let community = state.communities.get(&name).await?;
    state.favourites.remove_favourite(user_id, community.id).await?;
    Ok(Json(Message { message: "Successfully unfavourited the community" }))
}

pub async fn favourite_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<FavouriteStatus>, AppError> {
    let community = state.communities.get(&name).await?;
    let favourited = state.favourites.is_favourite(user_id, community.id).await?;
    Ok(Json(FavouriteStatus { favourited }))
}

pub async fn community_memes(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MemeListing>, AppError> {
    let request = PageRequest::<MemeSort>::from_query(&query);
    let page = state.feed.list_memes(Some(&name), request).await?;
    Ok(Json(MemeListing {
        size: page.items.len(),
        memes: page.items,
        total_count: page.total_count,
        offset: request.offset,
        sort: request.sort,
    }))
}

pub async fn community_templates(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TemplateListing>, AppError> {
    let request = PageRequest::<RankSort>::from_query(&query);
    let page = state.feed.list_templates(Some(&name), request).await?;
    Ok(Json(TemplateListing {
        size: page.items.len(),
        templates: page.items,
        total_count: page.total_count,
        offset: request.offset,
        sort: request.sort,
    }))
}

pub async fn community_exists(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Exists>, AppError> {
    let exists = state.communities.exists(&name).await?;
    Ok(Json(Exists { exists }))
}

// --- Memes ---

pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateMeme>, JsonRejection>,
) -> Result<Json<Meme>, AppError> {
    let Json(request) = payload?;
    let meme = state.memes.create(user_id, request).await?;
    Ok(Json(meme))
}

pub async fn list_memes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MemeListing>, AppError> {
    let request = PageRequest::<MemeSort>::from_query(&query);
    let page = state.feed.list_memes(None, request).await?;
    tracing::info!("Handler successfully retrieved {} memes", page.items.len());
    Ok(Json(MemeListing {
        size: page.items.len(),
        memes: page.items,
        total_count: page.total_count,
        offset: request.offset,
        sort: request.sort,
    }))
}

pub async fn get_meme(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Meme>, AppError> {
    let meme_id = parse_meme_id(&id_str)?;
    tracing::debug!(%meme_id, "Fetching meme details via handler");
    Ok(Json(state.memes.get(meme_id).await?))
}

pub async fn vote_meme(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id_str): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteResult>, AppError> {
    let meme_id = parse_meme_id(&id_str)?;
    let Json(request) = payload?;
    let direction = request
        .direction
        .as_deref()
        .and_then(|d| d.parse::<VoteDirection>().ok())
        .ok_or(ServiceError::Validation {
            field: "direction",
            reason: "must be one of up, down, none",
        })?;
    let net_vote = state.votes.apply_vote(meme_id, user_id, direction).await?;
    Ok(Json(VoteResult { net_vote }))
}

pub async fn my_vote(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id_str): Path<String>,
) -> Result<Json<CurrentVote>, AppError> {
    let meme_id = parse_meme_id(&id_str)?;
    let direction = state.votes.current_vote(meme_id, user_id).await?;
    Ok(Json(CurrentVote { direction }))
}

pub async fn meme_score(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<VoteResult>, AppError> {
    let meme_id = parse_meme_id(&id_str)?;
    let net_vote = state.votes.net_score(meme_id).await?;
    Ok(Json(VoteResult { net_vote }))
}

// --- Templates ---

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TemplateListing>, AppError> {
    let request = PageRequest::<RankSort>::from_query(&query);
    let page = state.feed.list_templates(None, request).await?;
    Ok(Json(TemplateListing {
        size: page.items.len(),
        templates: page.items,
        total_count: page.total_count,
        offset: request.offset,
        sort: request.sort,
    }))
}
