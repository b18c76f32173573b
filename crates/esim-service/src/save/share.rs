//! Toggling the shared flag of a snapshot.

use tracing::info;
use uuid::Uuid;

use esim_auth::Capability;
use esim_core::result::AppResult;
use esim_entity::save::{SharingState, StateSave};

use super::service::SaveService;
use crate::context::RequestContext;

impl SaveService {
    /// Turn sharing `on` or `off` for a snapshot owned by the caller.
    pub async fn set_sharing(
        &self,
        ctx: &RequestContext,
        save_id: Uuid,
        version: i32,
        branch: &str,
        sharing: &str,
    ) -> AppResult<StateSave> {
        let mut save = self.find_triple(save_id, version, branch).await?;
        self.gate
            .authorize(Some(ctx.user_id), &save, Capability::Modify)
            .await?;
        let state: SharingState = sharing.parse()?;

        save.shared = state.is_shared();
        let updated = self.repos.saves.update(&save).await?;

        info!(
            user_id = %ctx.user_id,
            save_id = %save_id,
            version,
            branch,
            sharing = %state,
            "State save sharing changed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use esim_core::error::ErrorKind;

    use super::*;
    use crate::save::service::tests::{ctx, fixture, input};

    #[tokio::test]
    async fn test_sharing_round_trip() {
        let f = fixture();
        let alice = ctx("alice");
        let bob = ctx("bob");
        let save = f.service.create_or_update(&alice, input("x")).await.unwrap().save;

        let on = f
            .service
            .set_sharing(&alice, save.save_id, 1, "main", "on")
            .await
            .unwrap();
        assert!(on.shared);
        assert!(f.service.fetch(Some(&bob), save.save_id, 1, "main").await.is_ok());

        let off = f
            .service
            .set_sharing(&alice, save.save_id, 1, "main", "off")
            .await
            .unwrap();
        assert!(!off.shared);
        let err = f
            .service
            .fetch(Some(&bob), save.save_id, 1, "main")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_sharing_checks_in_order() {
        let f = fixture();
        let alice = ctx("alice");
        let save = f.service.create_or_update(&alice, input("x")).await.unwrap().save;

        let err = f
            .service
            .set_sharing(&alice, Uuid::new_v4(), 1, "main", "maybe")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = f
            .service
            .set_sharing(&ctx("bob"), save.save_id, 1, "main", "maybe")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let err = f
            .service
            .set_sharing(&alice, save.save_id, 1, "main", "maybe")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
    }
}
