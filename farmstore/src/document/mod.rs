// Document model - the single aggregate persisted by a store

mod ids;

pub use ids::{new_id, IdStrategy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FarmStoreError;

/// The whole marketplace state. Every write replaces it in full.
///
/// `version` is the optimistic concurrency token: the store sets it on each
/// successful replace, and a versioned store rejects writes whose version is
/// not the one currently stored. Collections missing from a persisted file
/// load as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub chats: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Farmer,
    Buyer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Farmer => "farmer",
            Role::Buyer => "buyer",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = FarmStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "farmer" => Ok(Role::Farmer),
            "buyer" => Ok(Role::Buyer),
            other => Err(FarmStoreError::Validation(format!(
                "Unknown role '{other}' (expected admin, farmer or buyer)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    /// Stored and compared as plain text.
    pub password: String,
}

/// Input to `register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub farmer_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub inventory: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// A line of an order. `price` is the unit price copied at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub qty: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    Wallet,
    /// Cash on delivery.
    Cod,
}

impl FromStr for PaymentMethod {
    type Err = FarmStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "wallet" => Ok(PaymentMethod::Wallet),
            "cod" => Ok(PaymentMethod::Cod),
            other => Err(FarmStoreError::Validation(format!(
                "Unknown payment method '{other}'"
            ))),
        }
    }
}

/// An order as recorded at checkout. Buyer fields are a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub items: Vec<OrderItem>,
    pub buyer_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

/// `user1` is always the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user1: String,
    pub user2: String,
    pub message: String,
    pub time: String,
}

impl Document {
    /// The document a store starts from when nothing has been written yet.
    pub fn bootstrap() -> Self {
        let seed = |id: &str, role: Role, name: &str, email: &str, password: &str| User {
            id: id.to_string(),
            role,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        Document {
            version: 0,
            users: vec![
                seed("u_admin", Role::Admin, "Admin", "admin@farmvalue.com", "admin123"),
                seed("u_farmer1", Role::Farmer, "Farmer Ravi", "ravi@farm.com", "farmer123"),
                seed("u_buyer1", Role::Buyer, "Buyer Asha", "asha@buyer.com", "buyer123"),
            ],
            products: Vec::new(),
            orders: Vec::new(),
            chats: Vec::new(),
        }
    }

    /// Parse a persisted document. Any failure is reported as corrupt state.
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        serde_json::from_str(raw).map_err(|e| FarmStoreError::CorruptState(e.to_string()))
    }

    pub fn to_json(&self, pretty: bool) -> crate::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn chat(&self, id: &str) -> Option<&ChatMessage> {
        self.chats.iter().find(|c| c.id == id)
    }
}

impl Order {
    pub fn total(&self) -> f64 {
        self.items.iter().map(|i| i.price * i.qty as f64).sum()
    }
}
