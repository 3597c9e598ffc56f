//! User profiles and account opening.

use std::sync::Arc;

use chrono::Utc;

use flg_core::{
    CreditAccount, Identity, NewProfile, Profile, ProfileError, ProfileUpdate, UserId,
};
use flg_store::{run_transaction, DocumentStore, StoreTransaction, TxError};

type Result<T> = std::result::Result<T, ProfileError>;

/// A freshly opened account: the profile and the balance created with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedAccount {
    /// The new profile.
    pub profile: Profile,

    /// The balance, zero unless one already existed.
    pub account: CreditAccount,
}

/// Profile documents and the username index.
pub struct ProfileStore {
    store: Arc<dyn DocumentStore>,
}

impl ProfileStore {
    /// Create a profile store over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the caller's profile and claim its username.
    ///
    /// # Errors
    ///
    /// - `ProfileError::NotAuthenticated` without an identity.
    /// - `ProfileError::InvalidProfile` for a blank or oversized username.
    /// - `ProfileError::ProfileExists` if the caller already has a profile.
    /// - `ProfileError::UsernameTaken` if another user holds the username.
    pub async fn create_profile(&self, identity: &Identity, input: NewProfile) -> Result<Profile> {
        let user_id = identity.user_id().ok_or(ProfileError::NotAuthenticated)?.clone();
        let input = input.normalized()?;

        let profile = self
            .blocking(move |store| {
                run_transaction(store, |txn| {
                    insert_profile(txn, &user_id, input.clone())
                })
                .map_err(into_profile_error)
            })
            .await?;

        tracing::info!(user_id = %profile.user_id, username = %profile.username, "Profile created");
        Ok(profile)
    }

    /// Create the caller's profile and zero balance together.
    ///
    /// An existing balance is kept as is.
    ///
    /// # Errors
    ///
    /// Same as [`ProfileStore::create_profile`]. On error neither document
    /// is written.
    pub async fn open_account(
        &self,
        identity: &Identity,
        input: NewProfile,
    ) -> Result<OpenedAccount> {
        let user_id = identity.user_id().ok_or(ProfileError::NotAuthenticated)?.clone();
        let input = input.normalized()?;

        let opened = self
            .blocking(move |store| {
                run_transaction(store, |txn| {
                    let profile = insert_profile(txn, &user_id, input.clone())?;
                    let account = match txn.get_balance(&user_id)? {
                        Some(existing) => existing,
                        None => {
                            let account = CreditAccount::new_at(user_id.clone(), profile.created_at);
                            txn.put_balance(&account)?;
                            account
                        }
                    };
                    Ok(OpenedAccount { profile, account })
                })
                .map_err(into_profile_error)
            })
            .await?;

        tracing::info!(
            user_id = %opened.profile.user_id,
            username = %opened.profile.username,
            balance = opened.account.balance,
            "Account opened"
        );
        Ok(opened)
    }

    /// Apply a partial update to the caller's profile.
    ///
    /// A username change moves the index entry in the same transaction.
    ///
    /// # Errors
    ///
    /// - `ProfileError::NotAuthenticated` without an identity.
    /// - `ProfileError::InvalidProfile` for a blank or oversized username.
    /// - `ProfileError::ProfileNotFound` if the caller has no profile.
    /// - `ProfileError::UsernameTaken` if another user holds the username.
    pub async fn update_profile(
        &self,
        identity: &Identity,
        update: ProfileUpdate,
    ) -> Result<Profile> {
        let user_id = identity.user_id().ok_or(ProfileError::NotAuthenticated)?.clone();
        let update = update.normalized()?;

        let profile = self
            .blocking(move |store| {
                run_transaction(store, |txn| {
                    let mut profile = txn.get_profile(&user_id)?.ok_or_else(|| {
                        TxError::Aborted(ProfileError::ProfileNotFound {
                            user_id: user_id.to_string(),
                        })
                    })?;

                    if let Some(username) = &update.username {
                        if *username != profile.username {
                            claim_username(txn, username, &user_id)?;
                        }
                    }

                    if let Some(previous) = profile.apply(update.clone(), Utc::now()) {
                        txn.delete_username(&previous)?;
                        txn.put_username(&profile.username, &user_id)?;
                    }
                    txn.put_profile(&profile)?;
                    Ok(profile)
                })
                .map_err(into_profile_error)
            })
            .await?;

        tracing::info!(user_id = %profile.user_id, username = %profile.username, "Profile updated");
        Ok(profile)
    }

    /// The caller's profile, if one exists.
    ///
    /// # Errors
    ///
    /// - `ProfileError::NotAuthenticated` without an identity.
    /// - `ProfileError::Unavailable` if the store fails.
    pub async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
        let user_id = identity.user_id().ok_or(ProfileError::NotAuthenticated)?.clone();

        self.blocking(move |store| {
            store
                .get_profile(&user_id)
                .map_err(|e| ProfileError::Unavailable(e.to_string()))
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| ProfileError::Unavailable(format!("profile task failed: {e}")))?;

        if let Err(ProfileError::Unavailable(reason)) = &outcome {
            tracing::warn!(error = %reason, "Profile store unavailable");
        }
        outcome
    }
}

fn insert_profile(
    txn: &mut dyn StoreTransaction,
    user_id: &UserId,
    input: NewProfile,
) -> std::result::Result<Profile, TxError<ProfileError>> {
    if txn.get_profile(user_id)?.is_some() {
        return Err(TxError::Aborted(ProfileError::ProfileExists {
            user_id: user_id.to_string(),
        }));
    }
    claim_username(txn, &input.username, user_id)?;

    let profile = Profile::new(user_id.clone(), input, Utc::now());
    txn.put_profile(&profile)?;
    txn.put_username(&profile.username, user_id)?;
    Ok(profile)
}

fn claim_username(
    txn: &mut dyn StoreTransaction,
    username: &str,
    user_id: &UserId,
) -> std::result::Result<(), TxError<ProfileError>> {
    match txn.get_username_owner(username)? {
        Some(owner) if owner != *user_id => Err(TxError::Aborted(ProfileError::UsernameTaken {
            username: username.to_string(),
        })),
        _ => Ok(()),
    }
}

fn into_profile_error(err: TxError<ProfileError>) -> ProfileError {
    match err {
        TxError::Aborted(err) => err,
        TxError::Store(err) => ProfileError::Unavailable(err.to_string()),
    }
}
