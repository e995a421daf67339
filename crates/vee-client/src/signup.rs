//! Account creation. Runs before anyone is signed in, so it works on the
//! bare store rather than a [`Context`](crate::Context).

use std::sync::Arc;

use serde_json::json;
use vee_core::{records, validation, Expand, RecordStore, Result, User};

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub bio: String,
}

pub struct Registration {
    store: Arc<dyn RecordStore>,
}

impl Registration {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Checks every field in form order, stopping at the first failure, then
    /// creates the unverified user. Handle and email must both be unused.
    pub async fn register(&self, form: &SignUpForm) -> Result<User> {
        let store = self.store.as_ref();
        let username = validation::username_available(store, &form.username).await?;
        let full_name = validation::full_name(&form.full_name)?;
        validation::password(&form.password, &form.password_confirm)?;
        let email = validation::email_available(store, &form.email).await?;
        let bio = validation::bio(&form.bio)?;

        let fields = json!({
            "username": username,
            "full_name": full_name,
            "email": email,
            "bio": bio,
            "password": form.password,
            "passwordConfirm": form.password_confirm,
            "verified": false,
        });
        let user = records::<User>(store)
            .create(fields, &Expand::none())
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "sign-up failed"))?;
        tracing::info!(user = %user.username, "account created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vee_core::{collections, AppError, MockRecordStore};

    fn form() -> SignUpForm {
        SignUpForm {
            username: " Grace ".into(),
            full_name: "Grace Hopper".into(),
            email: "grace@navy.mil".into(),
            password: "cobol1959".into(),
            password_confirm: "cobol1959".into(),
            bio: String::new(),
        }
    }

    fn nobody_matches(store: &mut MockRecordStore) {
        store
            .expect_get_first_matching()
            .returning(|collection, filter| Err(AppError::not_found(collection, filter.to_string())));
    }

    #[tokio::test]
    async fn test_register_creates_unverified_user() {
        let mut store = MockRecordStore::new();
        nobody_matches(&mut store);
        store
            .expect_create()
            .withf(|collection, fields, _| {
                collection == collections::USERS
                    && fields["username"] == "grace"
                    && fields["email"] == "grace@navy.mil"
                    && fields["passwordConfirm"] == "cobol1959"
                    && fields["verified"] == false
            })
            .times(1)
            .returning(|_, fields, _| {
                Ok(json!({ "id": "u7", "username": fields["username"], "full_name": fields["full_name"] }))
            });

        let user = Registration::new(Arc::new(store)).register(&form()).await.unwrap();
        assert_eq!(user.id, "u7");
        assert_eq!(user.username, "grace");
    }

    #[tokio::test]
    async fn test_taken_username_stops_before_create() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .times(1)
            .returning(|_, _| Ok(json!({ "id": "u1", "username": "grace" })));
        store.expect_create().never();

        let err = Registration::new(Arc::new(store)).register(&form()).await.unwrap_err();
        assert_eq!(err, AppError::validation("Username is already taken."));
    }

    #[tokio::test]
    async fn test_bad_email_is_rejected() {
        let mut store = MockRecordStore::new();
        nobody_matches(&mut store);
        store.expect_create().never();

        let mut form = form();
        form.email = "grace@navy".into();
        let err = Registration::new(Arc::new(store)).register(&form).await.unwrap_err();
        assert_eq!(err, AppError::validation("Please enter a valid email address."));
    }
}
