use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    entities::tag,
    error::{AppError, AppResult},
    store::Store,
};

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTag {
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagChanges {
    pub name: Option<String>,
    pub color: Option<String>,
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if !(2..=20).contains(&len) {
        return Err(AppError::validation("name", "must be 2 to 20 characters"));
    }
    Ok(name.to_string())
}

/// `#RGB` or `#RRGGBB`, stored lowercase.
fn validate_color(color: &str) -> AppResult<String> {
    let hex = color.trim().strip_prefix('#').unwrap_or("");
    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::validation("color", "expected #RGB or #RRGGBB"));
    }
    Ok(format!("#{}", hex.to_ascii_lowercase()))
}

impl Store {
    pub async fn list_tags(&self, user_id: i32) -> AppResult<Vec<tag::Model>> {
        Ok(tag::Entity::find()
            .filter(tag::Column::UserId.eq(user_id))
            .order_by_asc(tag::Column::Name)
            .order_by_asc(tag::Column::Id)
            .all(self.db())
            .await?)
    }

    pub async fn create_tag(&self, user_id: i32, new: NewTag) -> AppResult<tag::Model> {
        let model = tag::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            name: Set(validate_name(&new.name)?),
            color: Set(validate_color(&new.color)?),
        };
        let created = model.insert(self.db()).await?;
        debug!(user_id, tag_id = created.id, "tag created");
        Ok(created)
    }

    /// The tag when `user_id` owns it. Someone else's tag is `Forbidden`.
    async fn owned_tag(&self, user_id: i32, tag_id: i32) -> AppResult<tag::Model> {
        let tag = self.find_or_not_found::<tag::Entity>(tag_id, "tag").await?;
        if tag.user_id != user_id {
            warn!(user_id, tag_id, owner = tag.user_id, "tag access denied");
            return Err(AppError::Forbidden);
        }
        Ok(tag)
    }

    pub async fn update_tag(&self, user_id: i32, tag_id: i32, changes: TagChanges) -> AppResult<tag::Model> {
        let tag = self.owned_tag(user_id, tag_id).await?;
        let name = changes.name.as_deref().map(validate_name).transpose()?;
        let color = changes.color.as_deref().map(validate_color).transpose()?;
        if name.is_none() && color.is_none() {
            return Ok(tag);
        }

        let mut active: tag::ActiveModel = tag.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(color) = color {
            active.color = Set(color);
        }
        let updated = active.update(self.db()).await?;
        debug!(user_id, tag_id, "tag updated");
        Ok(updated)
    }

    pub async fn remove_tag(&self, user_id: i32, tag_id: i32) -> AppResult<()> {
        self.owned_tag(user_id, tag_id).await?;
        tag::Entity::delete_by_id(tag_id).exec(self.db()).await?;
        debug!(user_id, tag_id, "tag removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support as seed;

    fn new_tag(name: &str, color: &str) -> NewTag {
        NewTag { name: name.into(), color: color.into() }
    }

    #[tokio::test]
    async fn tags_are_listed_per_user() {
        let store = seed::setup_store().await;
        let me = seed::user(store.db(), "me@example.com").await;
        let other = seed::user(store.db(), "other@example.com").await;

        store.create_tag(me, new_tag("rewatch", "#FFF")).await.unwrap();
        store.create_tag(me, new_tag("cinema", "#00aa00")).await.unwrap();
        store.create_tag(other, new_tag("theirs", "#123456")).await.unwrap();

        let mine: Vec<_> = store.list_tags(me).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(mine, vec!["cinema", "rewatch"]);
    }

    #[tokio::test]
    async fn foreign_tags_are_forbidden_and_untouched() {
        let store = seed::setup_store().await;
        let owner = seed::user(store.db(), "owner@example.com").await;
        let intruder = seed::user(store.db(), "intruder@example.com").await;
        let tag = store.create_tag(owner, new_tag("favorites", "#ff0000")).await.unwrap();

        let changes = TagChanges { name: Some("hijacked".into()), color: None };
        assert!(matches!(store.update_tag(intruder, tag.id, changes).await, Err(AppError::Forbidden)));
        assert!(matches!(store.remove_tag(intruder, tag.id).await, Err(AppError::Forbidden)));

        let still = tag::Entity::find_by_id(tag.id).one(store.db()).await.unwrap().unwrap();
        assert_eq!(still, tag);
    }

    #[tokio::test]
    async fn owner_updates_and_removes() {
        let store = seed::setup_store().await;
        let owner = seed::user(store.db(), "owner@example.com").await;
        let tag = store.create_tag(owner, new_tag("favorites", "#ff0000")).await.unwrap();

        let updated = store
            .update_tag(owner, tag.id, TagChanges { name: None, color: Some("#0F0".into()) })
            .await
            .unwrap();
        assert_eq!(updated.color, "#0f0");
        assert_eq!(updated.name, "favorites");

        store.remove_tag(owner, tag.id).await.unwrap();
        assert!(matches!(store.remove_tag(owner, tag.id).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn tag_input_validation() {
        assert!(validate_name("x").is_err());
        assert!(validate_name(&"y".repeat(21)).is_err());
        assert_eq!(validate_name("  ok ").unwrap(), "ok");
        assert!(matches!(validate_color("red"), Err(AppError::Validation { field: "color", .. })));
        assert!(validate_color("#12345").is_err());
        assert_eq!(validate_color("#ABCDEF").unwrap(), "#abcdef");
    }
}
