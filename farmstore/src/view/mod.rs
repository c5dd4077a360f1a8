// Read-only projections of a document for dashboards and listings.
// Lookups across collections tolerate dangling ids.

use crate::document::{ChatMessage, Document, Order, Product, Role, User};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Shown wherever a referenced user no longer exists.
pub const UNKNOWN: &str = "Unknown";

/// A product as listed in the buyer catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry<'a> {
    #[serde(flatten)]
    pub product: &'a Product,
    pub farmer_name: &'a str,
}

/// A farmer and how many products they list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerSummary<'a> {
    pub farmer: &'a User,
    pub product_count: usize,
}

/// Admins see every order, everyone else only their own.
pub fn orders_visible_to<'a>(doc: &'a Document, user: &User) -> Vec<&'a Order> {
    doc.orders
        .iter()
        .filter(|o| user.role == Role::Admin || o.buyer_id == user.id)
        .collect()
}

pub fn products_of<'a>(doc: &'a Document, farmer_id: &str) -> Vec<&'a Product> {
    doc.products
        .iter()
        .filter(|p| p.farmer_id == farmer_id)
        .collect()
}

pub fn farmers(doc: &Document) -> Vec<FarmerSummary<'_>> {
    doc.users
        .iter()
        .filter(|u| u.role == Role::Farmer)
        .map(|farmer| FarmerSummary {
            farmer,
            product_count: doc.products.iter().filter(|p| p.farmer_id == farmer.id).count(),
        })
        .collect()
}

/// Messages the user sent or received, oldest first.
pub fn conversations_for<'a>(doc: &'a Document, user_id: &str) -> Vec<&'a ChatMessage> {
    doc.chats
        .iter()
        .filter(|c| c.user1 == user_id || c.user2 == user_id)
        .collect()
}

pub fn user_name<'a>(doc: &'a Document, user_id: &str) -> &'a str {
    doc.user(user_id).map_or(UNKNOWN, |u| u.name.as_str())
}

pub fn catalog(doc: &Document) -> Vec<CatalogEntry<'_>> {
    doc.products
        .iter()
        .map(|product| CatalogEntry {
            product,
            farmer_name: user_name(doc, &product.farmer_id),
        })
        .collect()
}

/// Number of products carrying each category label.
pub fn category_breakdown(doc: &Document) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for product in &doc.products {
        for category in &product.categories {
            *counts.entry(category.as_str()).or_insert(0) += 1;
        }
    }
    counts
}

/// `(order date, total)` per order, in order of placement. Orders on the
/// same day stay separate points.
pub fn sales_series(doc: &Document) -> Vec<(NaiveDate, f64)> {
    doc.orders.iter().map(|o| (o.date.date_naive(), o.total())).collect()
}

/// Title of an ordered product, or a placeholder if it was deleted since.
pub fn product_title<'a>(doc: &'a Document, product_id: &str) -> &'a str {
    doc.product(product_id)
        .map_or("(removed product)", |p| p.title.as_str())
}
