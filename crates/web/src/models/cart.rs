//! Shopping cart types.

use emporium_core::Price;

use super::Product;

/// One cart line: a product and how many units the user wants.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Price of the whole line.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// A user's cart, in the order lines were first added.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{ProductId, UserId};

    use super::*;

    fn line(id: i32, price: &str, quantity: u32) -> CartLine {
        CartLine {
            product: Product {
                id: ProductId::new(id),
                owner_id: UserId::new(1),
                title: format!("Product {id}"),
                price: Price::parse(price).unwrap(),
                description: "Something".to_string(),
                image: "p.png".to_string(),
            },
            quantity,
        }
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::default();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_totals() {
        let cart = Cart {
            lines: vec![line(1, "2.50", 2), line(2, "10", 1)],
        };
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.lines[0].subtotal().to_string(), "5.00");
        assert_eq!(cart.total().to_string(), "15.00");
    }
}
