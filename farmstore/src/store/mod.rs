use crate::backend::Backend;
use crate::config::{StoreConfig, WriteMode};
use crate::document::{new_id, Document, NewUser, User};
use crate::error::{FarmStoreError, Result};
use crate::policy;
use crate::validation::{self, ValidationResult};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The operations a client needs from a document store.
///
/// Every write is a whole-document replace. `replace` returns the version the
/// stored document now carries; the caller's next write must be based on it
/// when the store is versioned.
pub trait DocumentStore {
    fn get(&self) -> Result<Document>;

    /// Overwrite the stored document. `actor` is the id of the acting user,
    /// required when the store enforces ownership.
    fn replace(&self, doc: Document, actor: Option<&str>) -> Result<u64>;

    fn authenticate(&self, email: &str, password: &str) -> Result<User>;

    fn register(&self, new_user: NewUser) -> Result<User>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self) -> Result<Document> {
        (**self).get()
    }

    fn replace(&self, doc: Document, actor: Option<&str>) -> Result<u64> {
        (**self).replace(doc, actor)
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        (**self).authenticate(email, password)
    }

    fn register(&self, new_user: NewUser) -> Result<User> {
        (**self).register(new_user)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn get(&self) -> Result<Document> {
        (**self).get()
    }

    fn replace(&self, doc: Document, actor: Option<&str>) -> Result<u64> {
        (**self).replace(doc, actor)
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        (**self).authenticate(email, password)
    }

    fn register(&self, new_user: NewUser) -> Result<User> {
        (**self).register(new_user)
    }
}

/// Who a write is made on behalf of.
#[derive(Clone, Copy)]
enum Authority<'a> {
    /// The store's own derived operations (register).
    Store,
    Actor(Option<&'a str>),
}

/// Counts and settings reported by `Store::status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub backend: String,
    pub version: u64,
    pub write_mode: WriteMode,
    pub enforce_ownership: bool,
    pub users: usize,
    pub products: usize,
    pub orders: usize,
    pub chats: usize,
}

/// The single source of truth for a marketplace document.
///
/// All reads and writes go through one mutex, so `get` never observes a
/// half-applied `replace`, and derived operations such as `register` check
/// and write in one critical section.
pub struct Store {
    backend: Mutex<Box<dyn Backend>>,
    config: StoreConfig,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never blocks on an in-flight write.
        let backend = match self.backend.try_lock() {
            Ok(backend) => backend.name(),
            Err(_) => "<busy>",
        };
        f.debug_struct("Store")
            .field("backend", &backend)
            .field("config", &self.config)
            .finish()
    }
}

impl Store {
    /// Open the store described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let backend = config.open_backend()?;
        Self::with_backend(backend, config)
    }

    /// Open a store over an explicit backend. The config's data path and
    /// backend kind are ignored.
    ///
    /// An empty backend is seeded with the bootstrap document. A corrupt one
    /// fails with `CorruptState` and is left untouched.
    pub fn with_backend(backend: Box<dyn Backend>, config: StoreConfig) -> Result<Self> {
        let store = Store {
            backend: Mutex::new(backend),
            config,
        };
        store.boot()?;
        Ok(store)
    }

    /// Boot lifecycle: load, seed if empty, report invariant violations
    fn boot(&self) -> Result<()> {
        let backend = self.lock()?;
        match backend.load()? {
            None => {
                log::info!("No document in {} backend, writing bootstrap data", backend.name());
                backend.save(&Document::bootstrap())?;
            }
            Some(doc) => {
                let vr = validation::validate_document(&doc);
                for err in &vr.errors {
                    log::warn!("Stored document violates an invariant: {err}");
                }
                for warning in &vr.warnings {
                    log::debug!("{warning}");
                }
                log::info!(
                    "Opened {} backend at version {} ({} users, {} products, {} orders, {} chats)",
                    backend.name(),
                    doc.version,
                    doc.users.len(),
                    doc.products.len(),
                    doc.orders.len(),
                    doc.chats.len()
                );
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Backend>>> {
        self.backend
            .lock()
            .map_err(|_| FarmStoreError::Other("store lock poisoned".into()))
    }

    fn load(backend: &dyn Backend) -> Result<Document> {
        Ok(backend.load()?.unwrap_or_else(Document::bootstrap))
    }

    /// Validate, authorize, version and persist `next` over `current`.
    /// Must be called with the backend lock held.
    fn commit(
        &self,
        backend: &dyn Backend,
        current: &Document,
        mut next: Document,
        authority: Authority<'_>,
    ) -> Result<u64> {
        if self.config.write_mode == WriteMode::Versioned && next.version != current.version {
            log::warn!(
                "Rejected stale write based on version {} (stored version {})",
                next.version,
                current.version
            );
            return Err(FarmStoreError::VersionConflict {
                expected: next.version,
                actual: current.version,
            });
        }

        let warnings = validation::validate_document(&next).into_result()?;
        for warning in &warnings {
            log::debug!("{warning}");
        }

        if let Authority::Actor(actor) = authority {
            if self.config.enforce_ownership {
                let actor_id = actor.ok_or_else(|| {
                    FarmStoreError::Forbidden("an acting user is required".into())
                })?;
                let user = current.user(actor_id).ok_or_else(|| {
                    FarmStoreError::Forbidden(format!("unknown acting user '{actor_id}'"))
                })?;
                if let Err(e) = policy::check_replace(user, current, &next) {
                    log::warn!("Rejected write by '{actor_id}': {e}");
                    return Err(e);
                }
            }
        }

        next.version = current.version + 1;
        backend.save(&next)?;
        log::debug!("Document replaced, now at version {}", next.version);
        Ok(next.version)
    }

    /// Apply `f` to the latest stored document and persist the result, all
    /// under the store lock. Nothing is written if `f` fails.
    pub fn mutate<T>(
        &self,
        actor: Option<&str>,
        f: impl FnOnce(&mut Document) -> Result<T>,
    ) -> Result<T> {
        self.mutate_as(Authority::Actor(actor), f)
    }

    fn mutate_as<T>(
        &self,
        authority: Authority<'_>,
        f: impl FnOnce(&mut Document) -> Result<T>,
    ) -> Result<T> {
        let backend = self.lock()?;
        let current = Self::load(&**backend)?;
        let mut next = current.clone();
        let value = f(&mut next)?;
        self.commit(&**backend, &current, next, authority)?;
        Ok(value)
    }

    /// Check the stored document against the invariants without writing.
    pub fn validate(&self) -> Result<ValidationResult> {
        let doc = self.get()?;
        Ok(validation::validate_document(&doc))
    }

    /// Get status information: backend, version, collection counts.
    pub fn status(&self) -> Result<StoreStatus> {
        let backend = self.lock()?;
        let doc = Self::load(&**backend)?;
        Ok(StoreStatus {
            backend: backend.name().to_string(),
            version: doc.version,
            write_mode: self.config.write_mode,
            enforce_ownership: self.config.enforce_ownership,
            users: doc.users.len(),
            products: doc.products.len(),
            orders: doc.orders.len(),
            chats: doc.chats.len(),
        })
    }
}

impl DocumentStore for Store {
    fn get(&self) -> Result<Document> {
        let backend = self.lock()?;
        Self::load(&**backend)
    }

    fn replace(&self, doc: Document, actor: Option<&str>) -> Result<u64> {
        let backend = self.lock()?;
        let current = Self::load(&**backend)?;
        self.commit(&**backend, &current, doc, Authority::Actor(actor))
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let doc = self.get()?;
        doc.users
            .into_iter()
            .find(|u| u.email == email && u.password == password)
            .ok_or(FarmStoreError::AuthenticationFailed)
    }

    fn register(&self, new_user: NewUser) -> Result<User> {
        if new_user.email.trim().is_empty() || new_user.password.is_empty() {
            return Err(FarmStoreError::Validation(
                "email and password are required".into(),
            ));
        }

        let id_strategy = self.config.id_strategy;
        let user = self.mutate_as(Authority::Store, |doc| {
            if doc.user_by_email(&new_user.email).is_some() {
                return Err(FarmStoreError::DuplicateEmail {
                    email: new_user.email.clone(),
                });
            }
            let mut id = new_id("u", id_strategy);
            while doc.user(&id).is_some() {
                id = new_id("u", id_strategy);
            }
            let user = User {
                id,
                role: new_user.role,
                name: new_user.name,
                email: new_user.email,
                password: new_user.password,
            };
            doc.users.push(user.clone());
            Ok(user)
        })?;

        log::info!("Registered {} '{}'", user.role, user.id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileBackend, MemoryBackend};
    use crate::config::BackendKind;
    use crate::document::{Product, Role};
    use pretty_assertions::assert_eq;
    use std::thread;
    use tempfile::TempDir;

    fn open_config() -> StoreConfig {
        StoreConfig {
            enforce_ownership: false,
            ..Default::default()
        }
    }

    fn setup_test_store() -> (MemoryBackend, Store) {
        let backend = MemoryBackend::new();
        let store = Store::with_backend(Box::new(backend.clone()), open_config()).unwrap();
        (backend, store)
    }

    fn product(id: &str) -> Product {
        Product {
            id: id.into(),
            farmer_id: "u_farmer1".into(),
            title: "Handwoven Jute Basket".into(),
            description: "Durable handwoven jute basket".into(),
            price: 850.0,
            inventory: 12,
            images: vec![],
            categories: vec!["Handmade".into(), "Home".into()],
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Kiran".into(),
            email: email.into(),
            password: "secret".into(),
            role: Role::Buyer,
        }
    }

    #[test]
    fn test_open_seeds_bootstrap() {
        let (backend, store) = setup_test_store();
        assert!(backend.raw().is_some());
        assert_eq!(store.get().unwrap(), Document::bootstrap());
    }

    #[test]
    fn test_open_sqlite_store_from_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("farm.db");
        let config = StoreConfig {
            backend: BackendKind::Sqlite,
            ..StoreConfig::for_path(&path)
        };

        let store = Store::open(config.clone()).unwrap();
        assert_eq!(store.status().unwrap().backend, "sqlite");
        let mut doc = store.get().unwrap();
        doc.products.push(product("p1"));
        assert_eq!(store.replace(doc, Some("u_admin")).unwrap(), 1);
        drop(store);

        let reopened = Store::open(config).unwrap();
        let doc = reopened.get().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.products, vec![product("p1")]);
    }

    #[test]
    fn test_debug_names_backend() {
        let (_backend, store) = setup_test_store();
        let out = format!("{store:?}");
        assert!(out.contains("backend: \"memory\""), "{out}");
        assert!(out.contains("Versioned"), "{out}");
    }

    #[test]
    fn test_open_on_disk_persists_bootstrap() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        let store = Store::open(StoreConfig::for_path(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(store.get().unwrap().users.len(), 3);
        assert_eq!(store.status().unwrap().backend, "json");
    }

    #[test]
    fn test_open_refuses_corrupt_state() {
        let backend = MemoryBackend::with_raw("{\"users\": [ {");
        let err = Store::with_backend(Box::new(backend.clone()), open_config()).unwrap_err();
        assert!(matches!(err, FarmStoreError::CorruptState(_)));
        // The corrupt content is not replaced with bootstrap data.
        assert_eq!(backend.raw().as_deref(), Some("{\"users\": [ {"));
    }

    #[test]
    fn test_open_refuses_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        std::fs::write(&path, "garbage").unwrap();
        let err = Store::open(StoreConfig::for_path(&path)).unwrap_err();
        assert!(matches!(err, FarmStoreError::CorruptState(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[test]
    fn test_replace_overwrites_whole_document() {
        let (_backend, store) = setup_test_store();
        let mut doc = store.get().unwrap();
        doc.products.push(product("p1"));
        doc.users.truncate(1);

        let version = store.replace(doc.clone(), None).unwrap();
        assert_eq!(version, 1);

        let stored = store.get().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.users.len(), 1);
        assert_eq!(stored.products, vec![product("p1")]);
    }

    #[test]
    fn test_replace_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        {
            let store = Store::open(StoreConfig {
                enforce_ownership: false,
                ..StoreConfig::for_path(&path)
            })
            .unwrap();
            let mut doc = store.get().unwrap();
            doc.products.push(product("p1"));
            store.replace(doc, None).unwrap();
        }
        let backend = FileBackend::new(&path);
        let doc = backend.load().unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.products.len(), 1);
    }

    #[test]
    fn test_invalid_replace_leaves_document_untouched() {
        let (_backend, store) = setup_test_store();
        let before = store.get().unwrap();

        let mut bad = before.clone();
        let mut p = product("p1");
        p.price = -5.0;
        bad.products.push(p);

        let err = store.replace(bad, None).unwrap_err();
        assert!(matches!(err, FarmStoreError::Validation(_)));
        assert_eq!(store.get().unwrap(), before);
    }

    #[test]
    fn test_persistence_error_is_returned_without_retry() {
        let (backend, store) = setup_test_store();
        let before = store.get().unwrap();
        backend.set_fail_writes(true);

        let mut doc = before.clone();
        doc.products.push(product("p1"));
        let err = store.replace(doc, None).unwrap_err();
        assert!(err.is_persistence());

        backend.set_fail_writes(false);
        assert_eq!(store.get().unwrap(), before);
    }

    #[test]
    fn test_versioned_replace_rejects_stale_write() {
        let (_backend, store) = setup_test_store();
        let base = store.get().unwrap();

        let mut first = base.clone();
        first.products.push(product("p_x"));
        store.replace(first, None).unwrap();

        let mut second = base;
        second.products.push(product("p_y"));
        let err = store.replace(second, None).unwrap_err();
        assert!(matches!(
            err,
            FarmStoreError::VersionConflict {
                expected: 0,
                actual: 1
            }
        ));

        let stored = store.get().unwrap();
        assert!(stored.product("p_x").is_some());
        assert!(stored.product("p_y").is_none());
    }

    #[test]
    fn test_blind_replace_loses_updates() {
        let store = Store::with_backend(
            Box::new(MemoryBackend::new()),
            StoreConfig {
                write_mode: WriteMode::Blind,
                ..open_config()
            },
        )
        .unwrap();
        let base = store.get().unwrap();

        let mut first = base.clone();
        first.products.push(product("p_x"));
        assert_eq!(store.replace(first, None).unwrap(), 1);

        let mut second = base;
        second.products.push(product("p_y"));
        assert_eq!(store.replace(second, None).unwrap(), 2);

        let stored = store.get().unwrap();
        assert!(stored.product("p_x").is_none());
        assert!(stored.product("p_y").is_some());
    }

    #[test]
    fn test_authenticate() {
        let (_backend, store) = setup_test_store();
        let user = store.authenticate("ravi@farm.com", "farmer123").unwrap();
        assert_eq!(user.id, "u_farmer1");
        assert_eq!(user.role, Role::Farmer);

        let wrong_password = store.authenticate("ravi@farm.com", "nope").unwrap_err();
        let unknown_email = store.authenticate("nobody@farm.com", "farmer123").unwrap_err();
        assert!(matches!(wrong_password, FarmStoreError::AuthenticationFailed));
        assert!(matches!(unknown_email, FarmStoreError::AuthenticationFailed));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());

        // Exact, case-sensitive comparison
        assert!(store.authenticate("RAVI@farm.com", "farmer123").is_err());
    }

    #[test]
    fn test_register_appends_user() {
        let (_backend, store) = setup_test_store();
        let user = store.register(new_user("kiran@buyer.com")).unwrap();
        assert!(user.id.starts_with("u_"));

        let doc = store.get().unwrap();
        assert_eq!(doc.users.len(), 4);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.user(&user.id), Some(&user));
        assert_eq!(
            store.authenticate("kiran@buyer.com", "secret").unwrap(),
            user
        );
    }

    #[test]
    fn test_register_duplicate_email_leaves_users_unchanged() {
        let (_backend, store) = setup_test_store();
        let before = store.get().unwrap();

        let err = store.register(new_user("asha@buyer.com")).unwrap_err();
        assert!(matches!(err, FarmStoreError::DuplicateEmail { .. }));
        assert_eq!(store.get().unwrap(), before);
    }

    #[test]
    fn test_register_requires_email_and_password() {
        let (_backend, store) = setup_test_store();
        let mut blank = new_user("  ");
        assert!(matches!(
            store.register(blank.clone()),
            Err(FarmStoreError::Validation(_))
        ));
        blank.email = "x@y.z".into();
        blank.password = String::new();
        assert!(store.register(blank).is_err());
    }

    #[test]
    fn test_concurrent_register_same_email_yields_one_user() {
        let (_backend, store) = setup_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.register(new_user("race@buyer.com")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let doc = store.get().unwrap();
        let matching = doc
            .users
            .iter()
            .filter(|u| u.email == "race@buyer.com")
            .count();
        assert_eq!(matching, 1);
    }

    #[test]
    fn test_register_bypasses_ownership_but_replace_does_not() {
        let store = Store::with_backend(Box::new(MemoryBackend::new()), StoreConfig::default())
            .unwrap();
        store.register(new_user("new@buyer.com")).unwrap();

        let mut doc = store.get().unwrap();
        doc.products.push(product("p1"));
        assert!(matches!(
            store.replace(doc.clone(), None),
            Err(FarmStoreError::Forbidden(_))
        ));
        assert!(matches!(
            store.replace(doc.clone(), Some("u_ghost")),
            Err(FarmStoreError::Forbidden(_))
        ));
        assert!(store.replace(doc.clone(), Some("u_buyer1")).is_err());
        assert_eq!(store.replace(doc, Some("u_farmer1")).unwrap(), 2);
    }

    #[test]
    fn test_mutate_is_transactional() {
        let (_backend, store) = setup_test_store();
        let before = store.get().unwrap();

        let err = store
            .mutate(None, |doc| {
                doc.products.push(product("p1"));
                Err::<(), _>(FarmStoreError::Other("abort".into()))
            })
            .unwrap_err();
        assert!(matches!(err, FarmStoreError::Other(_)));
        assert_eq!(store.get().unwrap(), before);

        let count = store
            .mutate(None, |doc| {
                doc.products.push(product("p1"));
                Ok(doc.products.len())
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.get().unwrap().version, 1);
    }

    #[test]
    fn test_status_and_validate() {
        let (_backend, store) = setup_test_store();
        let status = store.status().unwrap();
        assert_eq!(status.backend, "memory");
        assert_eq!(status.users, 3);
        assert_eq!(status.version, 0);
        assert!(store.validate().unwrap().is_ok());
    }
}
