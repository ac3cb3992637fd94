use crate::core::error::{AppError, StoreError};
use crate::models::api::CarouselRequest;
use crate::models::content::{parents_from_value, CarouselCard, CarouselDraft, Competition};
use crate::models::user::Identity;
use crate::services::trimmed;
use crate::stores::ContentStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Competitions and carousel cards. Reads are public; writes take the
/// identity that passed the admin gate.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
}

impl ContentService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn list_competitions(&self) -> Result<Vec<Competition>, AppError> {
        Ok(self.store.list_competitions().await?)
    }

    pub async fn create_competition(
        &self,
        admin: &Identity,
        name: Option<String>,
        icon: Option<String>,
    ) -> Result<i64, AppError> {
        let name = trimmed(name)
            .ok_or_else(|| AppError::Validation("Competition name is required".to_string()))?;
        let icon = trimmed(icon);

        match self.store.insert_competition(&name, icon.as_deref()).await {
            Ok(id) => {
                info!(competition_id = id, name = %name, admin_id = admin.user_id, "Competition created");
                Ok(id)
            }
            Err(StoreError::UniqueViolation) => Err(AppError::DuplicateName),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_competition(&self, admin: &Identity, id: i64) -> Result<(), AppError> {
        if !self.store.delete_competition(id).await? {
            return Err(AppError::NotFound("Competition"));
        }

        info!(competition_id = id, admin_id = admin.user_id, "Competition deleted");
        Ok(())
    }

    /// Cards in the nested layout with competition details attached
    pub async fn list_carousel(&self) -> Result<Vec<CarouselCard>, AppError> {
        let competitions: HashMap<i64, Competition> = self
            .store
            .list_competitions()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(self
            .store
            .list_carousel()
            .await?
            .into_iter()
            .map(|record| record.normalize(&competitions))
            .collect())
    }

    pub async fn create_carousel(
        &self,
        admin: &Identity,
        request: CarouselRequest,
    ) -> Result<i64, AppError> {
        let draft = draft_from(request)?;

        let id = self.store.insert_carousel(&draft).await?;
        info!(carousel_id = id, admin_id = admin.user_id, "Carousel card created");
        Ok(id)
    }

    /// Replace every mutable field of a card
    pub async fn update_carousel(
        &self,
        admin: &Identity,
        id: i64,
        request: CarouselRequest,
    ) -> Result<(), AppError> {
        let draft = draft_from(request)?;

        if !self.store.update_carousel(id, &draft).await? {
            return Err(AppError::NotFound("Carousel card"));
        }

        info!(carousel_id = id, admin_id = admin.user_id, "Carousel card updated");
        Ok(())
    }

    pub async fn delete_carousel(&self, admin: &Identity, id: i64) -> Result<(), AppError> {
        if !self.store.delete_carousel(id).await? {
            return Err(AppError::NotFound("Carousel card"));
        }

        info!(carousel_id = id, admin_id = admin.user_id, "Carousel card deleted");
        Ok(())
    }
}

fn draft_from(request: CarouselRequest) -> Result<CarouselDraft, AppError> {
    let title =
        trimmed(request.title).ok_or_else(|| AppError::Validation("Title is required".to_string()))?;

    let parents = match request.parents {
        Some(value) => parents_from_value(value)
            .map_err(|e| AppError::Validation(format!("Invalid parents: {}", e)))?,
        None => Vec::new(),
    };

    Ok(CarouselDraft {
        title,
        date: trimmed(request.date),
        subtitle: trimmed(request.subtitle),
        description: trimmed(request.description),
        parents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::stores::memory::MemoryContentStore;
    use serde_json::json;

    struct Fixture {
        service: ContentService,
        store: Arc<MemoryContentStore>,
        admin: Identity,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryContentStore::new());
        Fixture {
            service: ContentService::new(store.clone()),
            store,
            admin: Identity {
                user_id: 1,
                public_id: "root".to_string(),
                name: "Root".to_string(),
                email: "root@example.com".to_string(),
                role: Role::Admin,
            },
        }
    }

    fn card(title: Option<&str>, parents: Option<serde_json::Value>) -> CarouselRequest {
        CarouselRequest {
            title: title.map(str::to_string),
            parents,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_competition_name() {
        let f = fixture();

        f.service
            .create_competition(&f.admin, Some("Premier League".into()), None)
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .create_competition(&f.admin, Some("Premier League".into()), None)
                .await,
            Err(AppError::DuplicateName)
        ));

        let list = f.service.list_competitions().await.unwrap();
        assert_eq!(list.iter().filter(|c| c.name == "Premier League").count(), 1);
    }

    #[tokio::test]
    async fn test_competition_name_required() {
        let f = fixture();
        assert!(matches!(
            f.service.create_competition(&f.admin, Some("  ".into()), None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_carousel_round_trip_resolves_competition() {
        let f = fixture();

        let competition_id = f
            .service
            .create_competition(&f.admin, Some("Champions League".into()), Some("/icons/ucl.svg".into()))
            .await
            .unwrap();

        let parents = json!([{
            "title": "Tuesday",
            "dropdowns": [{"title": "Quarter final", "content": "Preview", "competition_id": competition_id}]
        }]);
        f.service
            .create_carousel(&f.admin, card(Some("Midweek"), Some(parents)))
            .await
            .unwrap();

        let cards = f.service.list_carousel().await.unwrap();
        assert_eq!(cards.len(), 1);
        let dropdown = &cards[0].parents[0].dropdowns[0];
        assert_eq!(dropdown.competition_name.as_deref(), Some("Champions League"));
        assert_eq!(dropdown.competition_icon.as_deref(), Some("/icons/ucl.svg"));
    }

    #[tokio::test]
    async fn test_carousel_update_replaces_all_fields() {
        let f = fixture();

        let mut request = card(Some("Original"), Some(json!([{"title":"g","dropdowns":[]}])));
        request.subtitle = Some("sub".into());
        let id = f.service.create_carousel(&f.admin, request).await.unwrap();

        f.service
            .update_carousel(&f.admin, id, card(Some("Replaced"), None))
            .await
            .unwrap();

        let cards = f.service.list_carousel().await.unwrap();
        assert_eq!(cards[0].title, "Replaced");
        assert_eq!(cards[0].subtitle, None);
        assert!(cards[0].parents.is_empty());
    }

    #[tokio::test]
    async fn test_carousel_validation_and_not_found() {
        let f = fixture();

        assert!(matches!(
            f.service.create_carousel(&f.admin, card(None, None)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.service
                .create_carousel(&f.admin, card(Some("t"), Some(json!("not json"))))
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.service.update_carousel(&f.admin, 404, card(Some("t"), None)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete_carousel(&f.admin, 404).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_groups_are_rejected_not_flattened() {
        let f = fixture();

        let null_dropdowns = json!([{"title": "Saturday", "dropdowns": null}]);
        let float_id = json!([{
            "title": "Saturday",
            "dropdowns": [{"title": "Derby", "competition_id": 7.0}]
        }]);
        let text_id = json!([{
            "title": "Saturday",
            "dropdowns": [{"title": "Derby", "competition_id": "seven"}]
        }]);

        for parents in [null_dropdowns, float_id, text_id] {
            assert!(matches!(
                f.service
                    .create_carousel(&f.admin, card(Some("Matchday"), Some(parents)))
                    .await,
                Err(AppError::Validation(_))
            ));
        }
        assert!(f.store.list_carousel().await.unwrap().is_empty());

        let id = f
            .service
            .create_carousel(&f.admin, card(Some("Matchday"), Some(json!([{"title": "Derby"}]))))
            .await
            .unwrap();
        let grouped = json!([{"title": "Sunday", "dropdowns": null}]);
        assert!(matches!(
            f.service
                .update_carousel(&f.admin, id, card(Some("Matchday"), Some(grouped)))
                .await,
            Err(AppError::Validation(_))
        ));

        let cards = f.service.list_carousel().await.unwrap();
        assert_eq!(cards[0].parents[0].dropdowns[0].title, "Derby");
    }
}
