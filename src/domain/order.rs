//! Order construction at checkout submission.
//!
//! An order snapshots everything the back office and the invoice need: the
//! customer contact, a flattened shipping address, one immutable item row per
//! cart line, and a synthetic item row for the shipping charge so the invoice
//! provider's per-item sum reconciles with the invoice amount.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::cascade::{Cascade, Level};
use crate::domain::checkout::ContactForm;
use crate::shipping::ShippingOption;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    AwaitingPayment,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "awaiting_payment" => Some(OrderStatus::AwaitingPayment),
            "paid" => Some(OrderStatus::Paid),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

/// Order header, ready to insert.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub courier: String,
    pub courier_service: String,
    pub shipping_cost: i64,
    pub subtotal: i64,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
}

/// One order line, immutable once written.
#[derive(Clone, Debug)]
pub struct OrderItemDraft {
    pub id: Uuid,
    pub order_id: Uuid,
    /// `None` for the synthetic shipping-charge row.
    pub product_id: Option<Uuid>,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub subtotal: i64,
}

impl OrderDraft {
    /// Builds the order header and item rows from the submitted checkout
    /// state. The last item row carries the shipping charge.
    pub fn from_checkout(
        cart: &Cart,
        contact: &ContactForm,
        cascade: &Cascade,
        option: &ShippingOption,
    ) -> (OrderDraft, Vec<OrderItemDraft>) {
        let subtotal = cart.total_price();
        let order_id = Uuid::now_v7();
        let draft = OrderDraft {
            id: order_id,
            order_number: format!("ORD-{:08}", rand::random::<u32>()),
            customer_name: contact.name.clone(),
            customer_email: contact.email.clone(),
            customer_phone: contact.phone.clone(),
            shipping_address: compose_address(contact, cascade),
            courier: option.courier.clone(),
            courier_service: option.service.clone(),
            shipping_cost: option.cost,
            subtotal,
            total_amount: subtotal + option.cost,
            status: OrderStatus::Pending,
            notes: contact.notes.clone(),
        };

        let mut items: Vec<OrderItemDraft> = cart
            .lines()
            .iter()
            .map(|line| OrderItemDraft {
                id: Uuid::now_v7(),
                order_id,
                product_id: Some(line.product_id),
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity as i32,
                subtotal: line.line_total(),
            })
            .collect();
        items.push(OrderItemDraft {
            id: Uuid::now_v7(),
            order_id,
            product_id: None,
            name: format!(
                "Shipping - {} {}",
                option.courier_name, option.service_label
            ),
            unit_price: option.cost,
            quantity: 1,
            subtotal: option.cost,
        });

        (draft, items)
    }
}

/// One-line shipping address for the order record: street address, then the
/// resolved locations finest-first, then the postal code when known.
fn compose_address(contact: &ContactForm, cascade: &Cascade) -> String {
    let mut parts = vec![contact.address.clone()];
    for level in [
        Level::Subdistrict,
        Level::District,
        Level::City,
        Level::Province,
    ] {
        if let Some(place) = cascade.selected(level) {
            parts.push(place.name.clone());
        }
    }
    let postal = contact
        .postal_code
        .as_deref()
        .or(cascade.postal_code());
    if let Some(zip) = postal {
        if !zip.is_empty() {
            parts.push(zip.to_string());
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::CartLine;
    use crate::domain::cascade::Place;

    fn fixture() -> (Cart, ContactForm, Cascade, ShippingOption) {
        let mut cart = Cart::new();
        cart.add(CartLine {
            product_id: Uuid::new_v4(),
            name: "Toraja Sapan 200g".into(),
            unit_price: 85_000,
            quantity: 1,
            weight_g: 200,
            image_url: None,
        });
        let second = Uuid::new_v4();
        cart.add(CartLine {
            product_id: second,
            name: "Drip Bag Box".into(),
            unit_price: 40_000,
            quantity: 1,
            weight_g: 120,
            image_url: None,
        });
        cart.set_quantity(second, 2);

        let contact = ContactForm {
            name: "Andi".into(),
            email: "andi@example.com".into(),
            phone: "081234567890".into(),
            address: "Jl. Hertasning No. 1".into(),
            postal_code: None,
            notes: Some("call on arrival".into()),
        };
        let mut cascade = Cascade::new();
        cascade.select(Level::Province, Place { id: 28, name: "Sulawesi Selatan".into() });
        cascade.select(Level::City, Place { id: 458, name: "Makassar".into() });
        let option = ShippingOption {
            courier: "jne".into(),
            courier_name: "JNE".into(),
            service: "REG".into(),
            service_label: "Reguler".into(),
            cost: 20_000,
            etd: "2-3".into(),
        };
        (cart, contact, cascade, option)
    }

    #[test]
    fn totals_and_item_rows() {
        let (cart, contact, cascade, option) = fixture();
        let (draft, items) = OrderDraft::from_checkout(&cart, &contact, &cascade, &option);

        assert_eq!(draft.subtotal, 165_000);
        assert_eq!(draft.total_amount, 185_000);
        assert_eq!(draft.status, OrderStatus::Pending);

        // One row per cart line plus the shipping row.
        assert_eq!(items.len(), 3);
        let shipping = items.last().unwrap();
        assert!(shipping.product_id.is_none());
        assert_eq!(shipping.subtotal, 20_000);
        let item_sum: i64 = items.iter().map(|i| i.subtotal).sum();
        assert_eq!(item_sum, draft.total_amount);
    }

    #[test]
    fn address_lists_locations_finest_first() {
        let (cart, contact, cascade, option) = fixture();
        let (draft, _) = OrderDraft::from_checkout(&cart, &contact, &cascade, &option);
        assert_eq!(
            draft.shipping_address,
            "Jl. Hertasning No. 1, Makassar, Sulawesi Selatan"
        );
    }

    #[test]
    fn status_round_trip() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::AwaitingPayment,
            OrderStatus::Paid,
            OrderStatus::Failed,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert!(OrderStatus::parse("shipped").is_none());
    }
}
