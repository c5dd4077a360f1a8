use crate::document::Document;
use crate::error::{FarmStoreError, Result};
use std::collections::HashSet;

/// Result of validating a document
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Turn collected errors into a single `Validation` error.
    /// Warnings are returned to the caller on success.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(FarmStoreError::Validation(self.errors.join("; ")))
        }
    }
}

/// Validate a whole document.
///
/// Errors are the invariants every stored document must hold: unique ids per
/// collection, unique user emails, non-negative product price and inventory,
/// non-empty orders with positive quantities. References between collections
/// are never enforced; a dangling one is only a warning.
pub fn validate_document(doc: &Document) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_unique_ids(&mut result, "users", doc.users.iter().map(|u| u.id.as_str()));
    check_unique_ids(&mut result, "products", doc.products.iter().map(|p| p.id.as_str()));
    check_unique_ids(&mut result, "orders", doc.orders.iter().map(|o| o.id.as_str()));
    check_unique_ids(&mut result, "chats", doc.chats.iter().map(|c| c.id.as_str()));

    let mut emails = HashSet::new();
    for user in &doc.users {
        if !emails.insert(user.email.as_str()) {
            result
                .errors
                .push(format!("Duplicate email '{}' in users", user.email));
        }
    }

    for product in &doc.products {
        if !product.price.is_finite() || product.price < 0.0 {
            result.errors.push(format!(
                "Product '{}' has invalid price {}",
                product.id, product.price
            ));
        }
        if product.inventory < 0 {
            result.errors.push(format!(
                "Product '{}' has negative inventory {}",
                product.id, product.inventory
            ));
        }
        if doc.user(&product.farmer_id).is_none() {
            result.warnings.push(format!(
                "Product '{}' references unknown farmer '{}'",
                product.id, product.farmer_id
            ));
        }
    }

    for order in &doc.orders {
        if order.items.is_empty() {
            result
                .errors
                .push(format!("Order '{}' has no items", order.id));
        }
        for item in &order.items {
            if item.qty <= 0 {
                result.errors.push(format!(
                    "Order '{}' has non-positive quantity {} for product '{}'",
                    order.id, item.qty, item.product_id
                ));
            }
            if !item.price.is_finite() || item.price < 0.0 {
                result.errors.push(format!(
                    "Order '{}' has invalid price {} for product '{}'",
                    order.id, item.price, item.product_id
                ));
            }
            if doc.product(&item.product_id).is_none() {
                result.warnings.push(format!(
                    "Order '{}' references unknown product '{}'",
                    order.id, item.product_id
                ));
            }
        }
        if doc.user(&order.buyer_id).is_none() {
            result.warnings.push(format!(
                "Order '{}' references unknown buyer '{}'",
                order.id, order.buyer_id
            ));
        }
    }

    for chat in &doc.chats {
        for participant in [&chat.user1, &chat.user2] {
            if doc.user(participant).is_none() {
                result.warnings.push(format!(
                    "Chat '{}' references unknown user '{}'",
                    chat.id, participant
                ));
            }
        }
    }

    result
}

fn check_unique_ids<'a>(
    result: &mut ValidationResult,
    collection: &str,
    ids: impl Iterator<Item = &'a str>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if id.is_empty() {
            result
                .errors
                .push(format!("Empty id in {collection}"));
        } else if !seen.insert(id) {
            result
                .errors
                .push(format!("Duplicate id '{id}' in {collection}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChatMessage, Order, OrderItem, OrderStatus, Product};
    use chrono::Utc;

    fn product(id: &str, price: f64, inventory: i64) -> Product {
        Product {
            id: id.into(),
            farmer_id: "u_farmer1".into(),
            title: "Terracotta Mug".into(),
            description: String::new(),
            price,
            inventory,
            images: vec![],
            categories: vec!["Handmade".into()],
        }
    }

    fn order(id: &str, items: Vec<OrderItem>) -> Order {
        Order {
            id: id.into(),
            items,
            buyer_id: "u_buyer1".into(),
            buyer_name: "Buyer Asha".into(),
            buyer_email: "asha@buyer.com".into(),
            date: Utc::now(),
            status: OrderStatus::Paid,
            payment_method: None,
        }
    }

    #[test]
    fn test_bootstrap_is_valid() {
        let vr = validate_document(&Document::bootstrap());
        assert!(vr.is_ok());
        assert!(!vr.has_warnings());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut doc = Document::bootstrap();
        doc.products.push(product("p1", 10.0, 1));
        doc.products.push(product("p1", 12.0, 1));
        let vr = validate_document(&doc);
        assert!(!vr.is_ok());
        assert!(vr.errors[0].contains("Duplicate id 'p1'"));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let mut doc = Document::bootstrap();
        let mut twin = doc.users[2].clone();
        twin.id = "u_other".into();
        doc.users.push(twin);
        assert!(!validate_document(&doc).is_ok());
    }

    #[test]
    fn test_negative_price_and_inventory_rejected() {
        let mut doc = Document::bootstrap();
        doc.products.push(product("p1", -1.0, 5));
        doc.products.push(product("p2", 1.0, -5));
        doc.products.push(product("p3", f64::NAN, 5));
        let vr = validate_document(&doc);
        assert_eq!(vr.errors.len(), 3);
    }

    #[test]
    fn test_order_items_must_be_non_empty_and_positive() {
        let mut doc = Document::bootstrap();
        doc.products.push(product("p1", 10.0, 1));
        doc.orders.push(order("o_1", vec![]));
        doc.orders.push(order(
            "o_2",
            vec![OrderItem {
                product_id: "p1".into(),
                qty: 0,
                price: 10.0,
            }],
        ));
        let vr = validate_document(&doc);
        assert_eq!(vr.errors.len(), 2);
        let err = vr.into_result().unwrap_err();
        assert!(matches!(err, FarmStoreError::Validation(_)));
    }

    #[test]
    fn test_dangling_references_are_warnings() {
        let mut doc = Document::bootstrap();
        let mut orphan = product("p1", 10.0, 1);
        orphan.farmer_id = "u_gone".into();
        doc.products.push(orphan);
        doc.orders.push(order(
            "o_1",
            vec![OrderItem {
                product_id: "p_deleted".into(),
                qty: 1,
                price: 10.0,
            }],
        ));
        doc.chats.push(ChatMessage {
            id: "chat_1".into(),
            user1: "u_buyer1".into(),
            user2: "u_nobody".into(),
            message: "hello".into(),
            time: "now".into(),
        });

        let vr = validate_document(&doc);
        assert!(vr.is_ok());
        assert_eq!(vr.warnings.len(), 3);
        assert_eq!(vr.into_result().unwrap().len(), 3);
    }
}
