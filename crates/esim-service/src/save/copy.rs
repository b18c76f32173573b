//! Copying a save to a new owner.

use tracing::info;
use uuid::Uuid;

use esim_auth::Capability;
use esim_core::error::AppError;
use esim_core::result::AppResult;
use esim_entity::save::StateSave;

use super::service::SaveService;
use crate::context::RequestContext;

impl SaveService {
    /// Copy the most recent row of `save_id` into a new private save owned
    /// by the caller. The source is left untouched.
    pub async fn copy(&self, ctx: &RequestContext, save_id: Uuid) -> AppResult<StateSave> {
        let source = self
            .repos
            .saves
            .find_latest(save_id)
            .await?
            .ok_or_else(|| AppError::not_found("Save not found"))?;
        self.gate
            .authorize(Some(ctx.user_id), &source, Capability::Read)
            .await?;

        self.repos.users.ensure(ctx.user_id, &ctx.username).await?;
        let copy = self.repos.saves.insert(&source.copy_for(ctx.user_id)).await?;

        info!(
            user_id = %ctx.user_id,
            source_save_id = %save_id,
            save_id = %copy.save_id,
            "State save copied"
        );
        Ok(copy)
    }
}
