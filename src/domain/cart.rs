//! Cart aggregate.
//!
//! One cart per storefront session. Lines snapshot the product's name, price,
//! weight and image at the time of adding; totals are always derived from the
//! current lines, never cached.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One product's accumulated quantity in the cart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: i64,
    pub quantity: u32,
    /// Recorded product weight; `0` means unknown and falls back to the
    /// configured default when the parcel weight is computed.
    pub weight_g: i32,
    pub image_url: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds one unit of a product. An existing line for the same product is
    /// merged (quantity + 1); otherwise a new line is appended with the
    /// snapshot carried by `line`.
    pub fn add(&mut self, line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity += 1;
        } else {
            self.lines.push(CartLine { quantity: 1, ..line });
        }
    }

    /// Sets a line's quantity to an absolute value. A quantity of zero or
    /// less removes the line, so no non-positive quantity is ever observable.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity as u32;
        }
    }

    pub fn remove(&mut self, product_id: Uuid) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total_price(&self) -> i64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total parcel weight. Lines with no recorded weight count as
    /// `default_item_weight_g` per unit.
    pub fn total_weight_g(&self, default_item_weight_g: i32) -> i64 {
        self.lines
            .iter()
            .map(|l| {
                let per_item = if l.weight_g > 0 {
                    l.weight_g
                } else {
                    default_item_weight_g
                };
                i64::from(per_item) * i64::from(l.quantity)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: Uuid, price: i64, weight_g: i32) -> CartLine {
        CartLine {
            product_id: id,
            name: "Toraja Sapan 200g".into(),
            unit_price: price,
            quantity: 1,
            weight_g,
            image_url: None,
        }
    }

    #[test]
    fn double_add_merges_into_one_line() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(id, 85_000, 200));
        cart.add(line(id, 85_000, 200));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn totals_follow_mutation_sequence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(a, 85_000, 200));
        cart.add(line(a, 85_000, 200));
        cart.add(line(b, 40_000, 0));
        assert_eq!(cart.total_price(), 2 * 85_000 + 40_000);

        cart.set_quantity(a, 5);
        assert_eq!(cart.total_price(), 5 * 85_000 + 40_000);

        cart.remove(b);
        assert_eq!(cart.total_price(), 5 * 85_000);

        cart.set_quantity(a, 0);
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), 0);
        assert!(cart.lines().iter().all(|l| l.quantity > 0));
    }

    #[test]
    fn negative_quantity_removes_line() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(id, 10_000, 100));
        cart.set_quantity(id, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn weight_uses_default_for_unweighed_products() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(a, 85_000, 200));
        cart.add(line(b, 40_000, 0));
        cart.set_quantity(b, 2);
        assert_eq!(cart.total_weight_g(250), 200 + 2 * 250);
    }
}
