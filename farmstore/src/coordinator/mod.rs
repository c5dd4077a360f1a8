// Client-side state: a mirror of the document, the cart, and checkout

mod cart;

pub use cart::{Cart, CartLine};

use crate::document::{
    new_id, ChatMessage, Document, IdStrategy, NewUser, Order, OrderItem, OrderStatus,
    PaymentMethod, Product, User,
};
use crate::error::{FarmStoreError, Result};
use crate::store::DocumentStore;
use crate::validation;
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

/// Checkout progress for one session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Checkout {
    #[default]
    Idle,
    /// The cart total has been computed and a payment method is awaited.
    PendingPayment { amount: f64 },
}

/// Fields for a product a farmer is about to list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub inventory: i64,
    pub images: Vec<String>,
    pub categories: Vec<String>,
}

/// A partial edit. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub inventory: Option<i64>,
    pub images: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
}

impl ProductUpdate {
    fn apply(self, product: &mut Product) {
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(inventory) = self.inventory {
            product.inventory = inventory;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(categories) = self.categories {
            product.categories = categories;
        }
    }
}

/// Holds an in-memory copy of the document and turns every user action into
/// "compute the next document, then replace the stored one".
///
/// The cart never reaches the store except as an order.
pub struct Coordinator<S: DocumentStore> {
    store: S,
    document: Document,
    current_user: Option<User>,
    cart: Cart,
    checkout: Checkout,
    id_strategy: IdStrategy,
}

impl<S: DocumentStore> Coordinator<S> {
    /// Fetch the document and start an anonymous session.
    pub fn connect(store: S) -> Result<Self> {
        let document = store.get()?;
        Ok(Coordinator {
            store,
            document,
            current_user: None,
            cart: Cart::default(),
            checkout: Checkout::Idle,
            id_strategy: IdStrategy::default(),
        })
    }

    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    /// Restore a cart kept from an earlier session.
    pub fn with_cart(mut self, cart: Cart) -> Self {
        self.cart = cart;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn checkout(&self) -> Checkout {
        self.checkout
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Re-fetch the document, discarding the local copy.
    pub fn refresh(&mut self) -> Result<()> {
        self.document = self.store.get()?;
        Ok(())
    }

    // ── Session ─────────────────────────────────────────────────────

    pub fn login(&mut self, email: &str, password: &str) -> Result<&User> {
        let user = self.store.authenticate(email, password)?;
        log::info!("Signed in as '{}'", user.id);
        Ok(self.current_user.insert(user))
    }

    /// Register and sign in as the new user.
    pub fn signup(&mut self, new_user: NewUser) -> Result<&User> {
        let user = self.store.register(new_user)?;
        self.refresh()?;
        Ok(self.current_user.insert(user))
    }

    pub fn logout(&mut self) {
        self.current_user = None;
        self.checkout = Checkout::Idle;
    }

    fn require_user(&self) -> Result<&User> {
        self.current_user.as_ref().ok_or(FarmStoreError::NotSignedIn)
    }

    /// Validate `next`, replace the stored document with it, and adopt it as
    /// the local copy. On failure the local copy is unchanged.
    fn commit(&mut self, mut next: Document) -> Result<()> {
        let warnings = validation::validate_document(&next).into_result()?;
        for warning in &warnings {
            log::debug!("{warning}");
        }
        let actor = self.current_user.as_ref().map(|u| u.id.as_str());
        next.version = self.store.replace(next.clone(), actor)?;
        self.document = next;
        Ok(())
    }

    // ── Products ────────────────────────────────────────────────────

    /// Build a listing owned by the signed-in user with a fresh id.
    pub fn new_product(&self, draft: ProductDraft) -> Result<Product> {
        let farmer = self.require_user()?;
        Ok(Product {
            id: new_id("p", self.id_strategy),
            farmer_id: farmer.id.clone(),
            title: draft.title,
            description: draft.description,
            price: draft.price,
            inventory: draft.inventory,
            images: draft.images,
            categories: draft.categories,
        })
    }

    /// Prepend a product and replace the document.
    pub fn add_product(&mut self, product: Product) -> Result<()> {
        let mut next = self.document.clone();
        next.products.insert(0, product);
        self.commit(next)
    }

    /// Replace the product with the given id by its edited version.
    pub fn edit_product(&mut self, id: &str, update: ProductUpdate) -> Result<Product> {
        let mut next = self.document.clone();
        let product = next
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| FarmStoreError::NotFound {
                collection: "products".into(),
                id: id.to_string(),
            })?;
        update.apply(product);
        let edited = product.clone();
        self.commit(next)?;
        Ok(edited)
    }

    pub fn delete_product(&mut self, id: &str) -> Result<()> {
        if self.document.product(id).is_none() {
            return Err(FarmStoreError::NotFound {
                collection: "products".into(),
                id: id.to_string(),
            });
        }
        let mut next = self.document.clone();
        next.products.retain(|p| p.id != id);
        self.commit(next)
    }

    // ── Cart ────────────────────────────────────────────────────────

    /// Changing the cart abandons a pending payment; the new total must be
    /// confirmed with another `place_order`.
    pub fn add_to_cart(&mut self, product: &Product) {
        self.cart.add(product);
        self.reset_pending_payment();
    }

    pub fn remove_from_cart(&mut self, product_id: &str) {
        self.cart.remove(product_id);
        self.reset_pending_payment();
    }

    fn reset_pending_payment(&mut self) {
        if let Checkout::PendingPayment { amount } = self.checkout {
            log::info!("Cart changed, abandoning pending payment of {amount}");
            self.checkout = Checkout::Idle;
        }
    }

    // ── Checkout ────────────────────────────────────────────────────

    /// First phase of checkout: compute the amount due. Nothing is written.
    pub fn place_order(&mut self) -> Result<f64> {
        if self.cart.is_empty() {
            log::warn!("Checkout attempted with an empty cart");
            return Err(FarmStoreError::EmptyCart);
        }
        if self.current_user.is_none() {
            log::warn!("Checkout attempted without signing in");
            return Err(FarmStoreError::NotSignedIn);
        }
        let amount = self.cart.total();
        self.checkout = Checkout::PendingPayment { amount };
        Ok(amount)
    }

    /// Second phase of checkout: record the paid order.
    ///
    /// Without a payment method the checkout stays pending. If the store
    /// rejects the write, the cart and the pending payment are kept so the
    /// user can retry.
    pub fn complete_order(&mut self, method: Option<PaymentMethod>) -> Result<Order> {
        if !matches!(self.checkout, Checkout::PendingPayment { .. }) {
            return Err(FarmStoreError::NoPendingPayment);
        }
        let method = method.ok_or(FarmStoreError::PaymentMethodRequired)?;
        if self.cart.is_empty() {
            return Err(FarmStoreError::EmptyCart);
        }
        let buyer = self.require_user()?;

        let order = Order {
            id: new_id("o", self.id_strategy),
            items: self
                .cart
                .lines()
                .iter()
                .map(|line| OrderItem {
                    product_id: line.product_id.clone(),
                    qty: line.qty,
                    price: line.price,
                })
                .collect(),
            buyer_id: buyer.id.clone(),
            buyer_name: buyer.name.clone(),
            buyer_email: buyer.email.clone(),
            date: Utc::now(),
            status: OrderStatus::Paid,
            payment_method: Some(method),
        };

        let mut next = self.document.clone();
        next.orders.push(order.clone());
        if let Err(e) = self.commit(next) {
            log::warn!("Order could not be saved, keeping cart for retry: {e}");
            return Err(e);
        }

        self.cart.clear();
        self.checkout = Checkout::Idle;
        log::info!("Payment successful, order {}", order.id);
        Ok(order)
    }

    /// Leave the payment step without ordering. The cart is kept.
    pub fn cancel_payment(&mut self) {
        self.checkout = Checkout::Idle;
    }

    // ── Chat ────────────────────────────────────────────────────────

    /// Send a message from the signed-in user. Blank text is ignored and
    /// nothing is written.
    pub fn send_message(&mut self, to_user: &str, text: &str) -> Result<Option<ChatMessage>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let sender = self.require_user()?;
        let chat = ChatMessage {
            id: new_id("chat", self.id_strategy),
            user1: sender.id.clone(),
            user2: to_user.to_string(),
            message: text.to_string(),
            time: Local::now().format("%d/%m/%Y, %H:%M:%S").to_string(),
        };

        let mut next = self.document.clone();
        next.chats.push(chat.clone());
        self.commit(next)?;
        Ok(Some(chat))
    }
}
