//! Order types.

use core::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{Email, OrderId, Price, ProductId, UserId};

use super::CartLine;

/// Snapshot of one product as it was when the order was placed.
///
/// Later edits or deletion of the product do not change the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Price,
    pub description: String,
    pub image: String,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            title: line.product.title.clone(),
            price: line.product.price,
            description: line.product.description.clone(),
            image: line.product.image.clone(),
            quantity: line.quantity,
        }
    }
}

/// A placed order. Immutable once created.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: Email,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }

    /// Render the plain-text invoice served by `GET /orders/{id}`.
    #[must_use]
    pub fn invoice_text(&self) -> String {
        let mut out = String::new();
        let rule = "-".repeat(40);

        // Writing to a String cannot fail.
        let _ = writeln!(out, "Invoice #{}", self.id);
        let _ = writeln!(out, "Date: {}", self.created_at.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out, "Customer: {}", self.user_email);
        let _ = writeln!(out, "{rule}");
        for item in &self.items {
            let _ = writeln!(
                out,
                "{} - {} x ${} = ${}",
                item.title,
                item.quantity,
                item.price,
                item.subtotal()
            );
        }
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total Price: ${}", self.total());
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn item(title: &str, price: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(1),
            title: title.to_string(),
            price: Price::parse(price).unwrap(),
            description: "desc".to_string(),
            image: "a.png".to_string(),
            quantity,
        }
    }

    fn order() -> Order {
        Order {
            id: OrderId::new(42),
            user_id: UserId::new(7),
            user_email: Email::parse("buyer@example.com").unwrap(),
            items: vec![item("Book", "12.50", 2), item("Pen", "1", 3)],
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_total() {
        assert_eq!(order().total().to_string(), "28.00");
    }

    #[test]
    fn test_invoice_text() {
        let text = order().invoice_text();
        assert!(text.starts_with("Invoice #42\n"));
        assert!(text.contains("Date: 2024-05-01 09:30 UTC"));
        assert!(text.contains("Customer: buyer@example.com"));
        assert!(text.contains("Book - 2 x $12.50 = $25.00"));
        assert!(text.contains("Pen - 3 x $1.00 = $3.00"));
        assert!(text.trim_end().ends_with("Total Price: $28.00"));
    }

    #[test]
    fn test_items_round_trip_through_json() {
        let items = order().items;
        let json = serde_json::to_value(&items).unwrap();
        let back: Vec<OrderItem> = serde_json::from_value(json).unwrap();
        assert_eq!(back, items);
    }
}
