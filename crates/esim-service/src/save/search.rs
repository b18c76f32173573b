//! Owner-scoped listings and search.

use uuid::Uuid;

use esim_core::error::AppError;
use esim_core::result::AppResult;
use esim_core::types::pagination::{PageRequest, PageResponse};
use esim_entity::save::{SaveFilter, StateSave};

use super::service::SaveService;
use crate::context::RequestContext;

impl SaveService {
    /// Every row the caller owns, newest first.
    pub async fn list_own(&self, ctx: &RequestContext) -> AppResult<Vec<StateSave>> {
        self.repos.saves.list_by_owner(ctx.user_id).await
    }

    /// The newest row of each of the caller's saves, newest first.
    pub async fn list_distinct_latest(&self, ctx: &RequestContext) -> AppResult<Vec<StateSave>> {
        self.repos.saves.list_latest_per_save(ctx.user_id).await
    }

    /// The caller's Arduino saves, newest first.
    pub async fn list_arduino(&self, ctx: &RequestContext) -> AppResult<Vec<StateSave>> {
        self.repos.saves.list_arduino(ctx.user_id).await
    }

    /// Filtered, paginated search over the caller's saves.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        filter: &SaveFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<StateSave>> {
        self.repos.saves.search(ctx.user_id, filter, page).await
    }

    /// All of the caller's rows of `save_id`, newest first.
    pub async fn list_versions(
        &self,
        ctx: &RequestContext,
        save_id: Uuid,
    ) -> AppResult<Vec<StateSave>> {
        self.repos.saves.list_versions(ctx.user_id, save_id).await
    }

    /// One of the caller's snapshots by exact triple.
    pub async fn get_specific_version(
        &self,
        ctx: &RequestContext,
        save_id: Uuid,
        version: i32,
        branch: &str,
    ) -> AppResult<StateSave> {
        self.repos
            .saves
            .find_owned_triple(ctx.user_id, save_id, version, branch)
            .await?
            .ok_or_else(|| AppError::not_found("Save version not found"))
    }
}

#[cfg(test)]
mod tests {
    use esim_core::error::ErrorKind;

    use super::*;
    use crate::save::service::CreateSaveInput;
    use crate::save::service::tests::{ctx, fixture, input};

    #[tokio::test]
    async fn test_listings_are_owner_scoped_and_newest_first() {
        let f = fixture();
        let alice = ctx("alice");
        let bob = ctx("bob");

        let first = f.service.create_or_update(&alice, input("a1")).await.unwrap().save;
        let second_version = f
            .service
            .create_or_update(
                &alice,
                CreateSaveInput {
                    save_id: Some(first.save_id),
                    ..input("a2")
                },
            )
            .await
            .unwrap()
            .save;
        let arduino = f
            .service
            .create_or_update(
                &alice,
                CreateSaveInput {
                    is_arduino: true,
                    ..input("sketch")
                },
            )
            .await
            .unwrap()
            .save;
        f.service.create_or_update(&bob, input("b1")).await.unwrap();

        let all = f.service.list_own(&alice).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, arduino.id);

        let latest = f.service.list_distinct_latest(&alice).await.unwrap();
        let ids: Vec<Uuid> = latest.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![arduino.id, second_version.id]);

        let sketches = f.service.list_arduino(&alice).await.unwrap();
        assert_eq!(sketches.len(), 1);
        assert!(sketches[0].is_arduino);

        let versions = f.service.list_versions(&alice, first.save_id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 2);
        assert!(f.service.list_versions(&bob, first.save_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_filters_and_paginates() {
        let f = fixture();
        let alice = ctx("alice");
        for (i, name) in ["Blink LED", "blinker", "Rectifier"].iter().enumerate() {
            f.service
                .create_or_update(
                    &alice,
                    CreateSaveInput {
                        name: name.to_string(),
                        is_arduino: i < 2,
                        ..input(&format!("dump-{i}"))
                    },
                )
                .await
                .unwrap();
        }

        let filter = SaveFilter {
            name: Some("BLINK".to_string()),
            ..Default::default()
        };
        let page = f
            .service
            .search(&alice, &filter, &PageRequest::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "blinker");
        assert!(page.has_next);

        let not_arduino = SaveFilter {
            is_arduino: Some(false),
            ..Default::default()
        };
        let page = f
            .service
            .search(&alice, &not_arduino, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Rectifier");

        let others = f
            .service
            .search(&ctx("bob"), &SaveFilter::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(others.total_items, 0);
    }

    #[tokio::test]
    async fn test_specific_version_is_owner_scoped() {
        let f = fixture();
        let alice = ctx("alice");
        let save = f.service.create_or_update(&alice, input("x")).await.unwrap().save;

        let found = f
            .service
            .get_specific_version(&alice, save.save_id, 1, "main")
            .await
            .unwrap();
        assert_eq!(found.id, save.id);

        let err = f
            .service
            .get_specific_version(&ctx("bob"), save.save_id, 1, "main")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
