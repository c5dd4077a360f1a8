pub mod config;
pub mod document;
pub mod backend;
pub mod validation;
pub mod policy;
pub mod store;
pub mod coordinator;
pub mod view;
pub mod error;

pub use backend::{Backend, FileBackend, MemoryBackend, SqliteBackend};
pub use config::{BackendKind, StoreConfig, WriteMode};
pub use coordinator::{Cart, Checkout, Coordinator, ProductDraft, ProductUpdate};
pub use document::{
    ChatMessage, Document, IdStrategy, NewUser, Order, OrderItem, OrderStatus, PaymentMethod,
    Product, Role, User,
};
pub use error::{FarmStoreError, Result};
pub use store::{DocumentStore, Store, StoreStatus};
