use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::{
    entities::user,
    error::{AppError, AppResult},
    models::RatingSource,
    params::PreferenceSource,
    store::Store,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub preferred_rating: Option<RatingSource>,
}

impl From<user::Model> for Profile {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            username: user.username,
            avatar_url: user.avatar_url,
            preferred_rating: user.preferred_rating.as_deref().and_then(RatingSource::parse),
        }
    }
}

/// Absent fields are left unchanged; `null` clears a nullable field.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileChanges {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub username: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub preferred_rating: Option<Option<RatingSource>>,
}

fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Store {
    pub async fn profile(&self, user_id: i32) -> AppResult<Profile> {
        let user = self.find_or_not_found::<user::Entity>(user_id, "user").await?;
        Ok(user.into())
    }

    pub async fn update_profile(&self, user_id: i32, changes: ProfileChanges) -> AppResult<Profile> {
        let user = self.find_or_not_found::<user::Entity>(user_id, "user").await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = changes.name {
            active.name = Set(blank_to_none(name));
        }
        if let Some(username) = changes.username {
            let username = blank_to_none(username);
            if let Some(u) = &username {
                if u.chars().count() > 32 || !u.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
                    return Err(AppError::validation("username", "use up to 32 letters, digits, `_` or `.`"));
                }
            }
            active.username = Set(username);
        }
        if let Some(avatar_url) = changes.avatar_url {
            active.avatar_url = Set(blank_to_none(avatar_url));
        }
        if let Some(preferred) = changes.preferred_rating {
            active.preferred_rating = Set(preferred.map(|source| source.as_str().to_string()));
        }

        let updated = active.update(self.db()).await?;
        debug!(user_id, "profile updated");
        Ok(updated.into())
    }
}

#[async_trait]
impl PreferenceSource for Store {
    async fn preferred_rating_source(&self, user_id: i32) -> AppResult<Option<RatingSource>> {
        Ok(self.profile(user_id).await?.preferred_rating)
    }
}
