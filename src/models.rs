use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type CommunityId = i64;
pub type MemeId = i64;
pub type TemplateId = i64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    pub title: String,
    pub description: String,
    pub sidebar: String,
    pub nsfw: bool,
    pub creator_id: UserId,
    pub favourites_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCommunity {
    pub name: String,
    pub title: String,
    pub description: String,
    pub sidebar: String,
    pub nsfw: bool,
    pub creator_id: UserId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub id: MemeId,
    pub title: String,
    /// Stored exactly as submitted; uniqueness is checked on the lower-cased form.
    pub link: String,
    pub net_vote: i64,
    pub creator_id: UserId,
    pub template_id: Option<TemplateId>,
    pub community_id: Option<CommunityId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMeme {
    pub title: String,
    pub link: String,
    /// Lower-cased `link`, the key of the uniqueness guard.
    pub canonical_link: String,
    pub creator_id: UserId,
    pub template_id: Option<TemplateId>,
    pub community_id: Option<CommunityId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub community_id: Option<CommunityId>,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub community_id: Option<CommunityId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Favourite {
    pub user_id: UserId,
    pub community_id: CommunityId,
}

/// A user's single effective vote on a meme.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
    None,
}

impl VoteDirection {
    /// Contribution of this vote to a meme's net score.
    pub fn weight(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
            VoteDirection::None => 0,
        }
    }

    pub fn from_weight(weight: i64) -> Option<Self> {
        match weight {
            1 => Some(VoteDirection::Up),
            -1 => Some(VoteDirection::Down),
            0 => Some(VoteDirection::None),
            _ => None,
        }
    }
}

impl std::str::FromStr for VoteDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            "none" => Ok(VoteDirection::None),
            _ => Err(()),
        }
    }
}
