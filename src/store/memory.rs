//! In-process store backing every capability trait.
//!
//! Keeps all records in concurrent maps; token plaintexts are hashed before
//! they are used as keys. Suitable for development and tests; the trait
//! seam is where a database-backed implementation would plug in.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::models::filters::{Filters, Metadata};
use crate::models::token::hash_plaintext;
use crate::models::{Movie, PermissionSet, Token, TokenScope, User};
use crate::security::authenticate::{AuthenticatedUser, Principal};
use crate::store::{MovieStore, PermissionStore, StoreError, TokenStore, UserStore};

#[derive(Debug, Clone)]
struct TokenRecord {
    user_id: i64,
    scope: TokenScope,
    expiry: DateTime<Utc>,
}

/// Concurrent in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<i64, User>,
    user_ids_by_email: DashMap<String, i64>,
    tokens: DashMap<[u8; 32], TokenRecord>,
    permissions: DashMap<i64, BTreeSet<String>>,
    movies: DashMap<i64, Movie>,
    next_user_id: AtomicI64,
    next_movie_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn user_for_token(&self, scope: TokenScope, plaintext: &str) -> Result<User, StoreError> {
        let record = self
            .tokens
            .get(&hash_plaintext(plaintext))
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound)?;
        if record.scope != scope || record.expiry <= Utc::now() {
            return Err(StoreError::NotFound);
        }
        self.users
            .get(&record.user_id)
            .map(|u| u.value().clone())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &mut User) -> Result<(), StoreError> {
        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        // The email index entry doubles as the uniqueness claim; whoever
        // inserts it owns the address.
        match self.user_ids_by_email.entry(user.email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(StoreError::DuplicateEmail),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        user.id = id;
        user.created_at = Utc::now();
        user.version = 1;
        self.users.insert(id, user.clone());
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let id = *self
            .user_ids_by_email
            .get(email)
            .ok_or(StoreError::NotFound)?;
        self.users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn get_for_token(
        &self,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<User, StoreError> {
        self.user_for_token(scope, plaintext)
    }

    async fn update(&self, user: &mut User) -> Result<(), StoreError> {
        let mut stored = self.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        if stored.version != user.version {
            return Err(StoreError::EditConflict);
        }
        user.version += 1;
        *stored = user.clone();
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn resolve_for_scope(
        &self,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<Principal, StoreError> {
        let user = self.user_for_token(scope, plaintext)?;
        Ok(Principal::User(AuthenticatedUser {
            id: user.id,
            activated: user.activated,
        }))
    }

    async fn create(
        &self,
        user_id: i64,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<Token, StoreError> {
        let token = Token::generate(user_id, ttl, scope);
        self.tokens.insert(
            token.hash,
            TokenRecord {
                user_id,
                scope,
                expiry: token.expiry,
            },
        );
        Ok(token)
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: i64,
    ) -> Result<(), StoreError> {
        self.tokens
            .retain(|_, record| !(record.scope == scope && record.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn list_for_principal(&self, user_id: i64) -> Result<PermissionSet, StoreError> {
        Ok(self
            .permissions
            .get(&user_id)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_for_principal(&self, user_id: i64, code: &str) -> Result<(), StoreError> {
        self.permissions
            .entry(user_id)
            .or_default()
            .insert(code.to_string());
        Ok(())
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn insert(&self, movie: &mut Movie) -> Result<(), StoreError> {
        let id = self.next_movie_id.fetch_add(1, Ordering::SeqCst) + 1;
        movie.id = id;
        movie.created_at = Utc::now();
        movie.version = 1;
        self.movies.insert(id, movie.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Movie, StoreError> {
        self.movies
            .get(&id)
            .map(|m| m.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn list(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata), StoreError> {
        let needle = title.to_lowercase();
        let mut matched: Vec<Movie> = self
            .movies
            .iter()
            .map(|m| m.value().clone())
            .filter(|m| needle.is_empty() || m.title.to_lowercase().contains(&needle))
            .filter(|m| genres.iter().all(|g| m.genres.contains(g)))
            .collect();

        let descending = filters.sort_descending();
        matched.sort_by(|a, b| {
            let ordering = match filters.sort_column() {
                "title" => a.title.cmp(&b.title),
                "year" => a.year.cmp(&b.year),
                "runtime" => a.runtime.0.cmp(&b.runtime.0),
                _ => a.id.cmp(&b.id),
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total = matched.len() as i64;
        let page: Vec<Movie> = matched
            .into_iter()
            .skip(filters.offset())
            .take(filters.limit())
            .collect();
        Ok((page, Metadata::calculate(total, filters.page, filters.page_size)))
    }

    async fn update(&self, movie: &mut Movie) -> Result<(), StoreError> {
        let mut stored = self.movies.get_mut(&movie.id).ok_or(StoreError::NotFound)?;
        if stored.version != movie.version {
            return Err(StoreError::EditConflict);
        }
        movie.version += 1;
        *stored = movie.clone();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.movies.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Runtime;

    fn movie(title: &str, year: i32, runtime: i32, genres: &[&str]) -> Movie {
        Movie {
            id: 0,
            created_at: Utc::now(),
            title: title.to_string(),
            year,
            runtime: Runtime(runtime),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            version: 0,
        }
    }

    async fn seeded_user(store: &MemoryStore, email: &str) -> User {
        let mut user = User::new("Test".to_string(), email.to_string());
        user.password.set("pa55word!");
        UserStore::insert(store, &mut user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        seeded_user(&store, "a@example.com").await;
        let mut again = User::new("Other".to_string(), "a@example.com".to_string());
        assert!(matches!(
            UserStore::insert(&store, &mut again).await,
            Err(StoreError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn token_resolution_honors_scope_and_expiry() {
        let store = MemoryStore::new();
        let user = seeded_user(&store, "a@example.com").await;

        let good = store
            .create(user.id, Duration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();
        let expired = store
            .create(user.id, Duration::seconds(-1), TokenScope::Authentication)
            .await
            .unwrap();
        let wrong_scope = store
            .create(user.id, Duration::hours(1), TokenScope::Activation)
            .await
            .unwrap();

        assert!(store
            .resolve_for_scope(TokenScope::Authentication, &good.plaintext)
            .await
            .is_ok());
        assert!(matches!(
            store
                .resolve_for_scope(TokenScope::Authentication, &expired.plaintext)
                .await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store
                .resolve_for_scope(TokenScope::Authentication, &wrong_scope.plaintext)
                .await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_all_for_user_is_scoped() {
        let store = MemoryStore::new();
        let user = seeded_user(&store, "a@example.com").await;
        let auth = store
            .create(user.id, Duration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();
        let activation = store
            .create(user.id, Duration::hours(1), TokenScope::Activation)
            .await
            .unwrap();

        store
            .delete_all_for_user(TokenScope::Activation, user.id)
            .await
            .unwrap();

        assert!(store
            .resolve_for_scope(TokenScope::Authentication, &auth.plaintext)
            .await
            .is_ok());
        assert!(store
            .get_for_token(TokenScope::Activation, &activation.plaintext)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn stale_version_update_conflicts() {
        let store = MemoryStore::new();
        let user = seeded_user(&store, "a@example.com").await;

        let mut first = user.clone();
        first.activated = true;
        UserStore::update(&store, &mut first).await.unwrap();

        // Still holding the original version.
        let mut second = user.clone();
        second.name = "Renamed".to_string();
        assert!(matches!(
            UserStore::update(&store, &mut second).await,
            Err(StoreError::EditConflict)
        ));
    }

    #[tokio::test]
    async fn permissions_accumulate_per_user() {
        let store = MemoryStore::new();
        store.add_for_principal(1, "movies:read").await.unwrap();
        store.add_for_principal(1, "movies:write").await.unwrap();

        let set = store.list_for_principal(1).await.unwrap();
        assert!(set.includes("movies:read"));
        assert!(set.includes("movies:write"));
        assert!(store.list_for_principal(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_filters_sorts_and_paginates() {
        let store = MemoryStore::new();
        for m in [
            movie("Alien", 1979, 117, &["horror", "sci-fi"]),
            movie("Aliens", 1986, 137, &["action", "sci-fi"]),
            movie("Arrival", 2016, 116, &["sci-fi"]),
            movie("Amélie", 2001, 122, &["comedy"]),
        ] {
            let mut m = m;
            MovieStore::insert(&store, &mut m).await.unwrap();
        }

        let filters = Filters {
            page: 1,
            page_size: 2,
            sort: "-year".to_string(),
            sort_safelist: vec!["id", "year", "-year"],
        };
        let (page, metadata) = store
            .list("alien", &["sci-fi".to_string()], &filters)
            .await
            .unwrap();
        assert_eq!(
            page.iter().map(|m| m.title.as_str()).collect::<Vec<_>>(),
            vec!["Aliens", "Alien"]
        );
        assert_eq!(metadata.total_records, 2);

        let (all, metadata) = store
            .list(
                "",
                &[],
                &Filters {
                    page: 2,
                    page_size: 3,
                    sort: "id".to_string(),
                    sort_safelist: vec!["id"],
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(metadata.last_page, 2);
    }

    #[tokio::test]
    async fn delete_missing_movie_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.delete(42).await, Err(StoreError::NotFound)));
    }
}
