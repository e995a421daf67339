//! Account settings: profile fields and password.

use serde_json::json;
use vee_core::{records, validation, Result, User};

use crate::Context;

pub struct AccountSettings {
    ctx: Context,
}

impl AccountSettings {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Saves name and bio; the session adopts the updated record.
    pub async fn update_profile(&self, full_name: &str, bio: &str) -> Result<User> {
        let full_name = validation::full_name(full_name)?;
        let bio = validation::bio(bio)?;

        let updated = records::<User>(self.ctx.store())
            .update(&self.ctx.session.user_id(), json!({ "full_name": full_name, "bio": bio }))
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "failed to update profile"))?;
        self.ctx.session.set_user(updated.clone());
        Ok(updated)
    }

    /// The store checks `old_password`; the new one is validated here first.
    pub async fn change_password(&self, old_password: &str, password: &str, confirm: &str) -> Result<()> {
        validation::password(password, confirm)?;

        records::<User>(self.ctx.store())
            .update(
                &self.ctx.session.user_id(),
                json!({ "oldPassword": old_password, "password": password, "passwordConfirm": confirm }),
            )
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "failed to change password"))?;
        Ok(())
    }
}
