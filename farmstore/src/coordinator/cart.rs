use crate::document::Product;
use serde::{Deserialize, Serialize};

/// One product in the cart. Title and price are copied when first added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub title: String,
    pub price: f64,
    pub qty: i64,
}

/// The local shopping cart, newest line first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Add one unit; an existing line has its quantity bumped instead.
    pub fn add(&mut self, product: &Product) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.qty += 1;
            return;
        }
        self.lines.insert(
            0,
            CartLine {
                product_id: product.id.clone(),
                title: product.title.clone(),
                price: product.price,
                qty: 1,
            },
        );
    }

    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.price * l.qty as f64).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
