//! Product domain types and form validation.

use serde::Deserialize;

use emporium_core::{Price, ProductId, UserId};

/// Minimum title length after trimming.
const MIN_TITLE_LENGTH: usize = 3;
/// Description length bounds after trimming.
const MIN_DESCRIPTION_LENGTH: usize = 5;
const MAX_DESCRIPTION_LENGTH: usize = 400;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    /// The user who created the product; only they may change it.
    pub owner_id: UserId,
    pub title: String,
    pub price: Price,
    pub description: String,
    /// Stored image file name inside the images directory.
    pub image: String,
}

impl Product {
    /// Public URL of the product image.
    #[must_use]
    pub fn image_url(&self) -> String {
        format!("/images/{}", self.image)
    }

    /// Whether `user` created this product.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// Data needed to insert a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub price: Price,
    pub description: String,
    pub image: String,
}

/// Changes applied by the edit form. `image` is `None` to keep the current file.
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub title: String,
    pub price: Price,
    pub description: String,
    pub image: Option<String>,
}

/// Raw product form input, kept verbatim so a rejected form can be re-rendered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
}

/// Product fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProduct {
    pub title: String,
    pub price: Price,
    pub description: String,
}

/// A product form field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title must be at least 3 characters long.")]
    TitleTooShort,
    #[error("Price must be a positive amount with at most two decimal places, up to 9999999999.99.")]
    InvalidPrice(#[from] emporium_core::PriceError),
    #[error("Description must be between 5 and 400 characters long.")]
    DescriptionLength,
}

impl ProductForm {
    /// Build a form pre-filled from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
        }
    }

    /// Validate and normalize the form.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking title, price and
    /// description in that order.
    pub fn validate(&self) -> Result<ValidProduct, ValidationError> {
        let title = self.title.trim();
        if title.chars().count() < MIN_TITLE_LENGTH {
            return Err(ValidationError::TitleTooShort);
        }

        let price = Price::parse(&self.price)?;

        let description = self.description.trim();
        let description_len = description.chars().count();
        if !(MIN_DESCRIPTION_LENGTH..=MAX_DESCRIPTION_LENGTH).contains(&description_len) {
            return Err(ValidationError::DescriptionLength);
        }

        Ok(ValidProduct {
            title: title.to_string(),
            price,
            description: description.to_string(),
        })
    }
}

impl ValidProduct {
    /// Attach the stored image to produce an insertable product.
    #[must_use]
    pub fn with_image(self, image: String) -> NewProduct {
        NewProduct {
            title: self.title,
            price: self.price,
            description: self.description,
            image,
        }
    }

    /// Turn into an edit, optionally replacing the image.
    #[must_use]
    pub fn into_changes(self, image: Option<String>) -> ProductChanges {
        ProductChanges {
            title: self.title,
            price: self.price,
            description: self.description,
            image,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emporium_core::PriceError;

    fn form(title: &str, price: &str, description: &str) -> ProductForm {
        ProductForm {
            title: title.to_string(),
            price: price.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_and_trims() {
        let valid = form("  Book  ", "12.99", "  A great read ").validate().unwrap();
        assert_eq!(valid.title, "Book");
        assert_eq!(valid.price.to_string(), "12.99");
        assert_eq!(valid.description, "A great read");
    }

    #[test]
    fn test_validate_title_length() {
        assert_eq!(
            form("ab", "1", "Long enough").validate(),
            Err(ValidationError::TitleTooShort)
        );
        assert_eq!(
            form("  ab   ", "1", "Long enough").validate(),
            Err(ValidationError::TitleTooShort)
        );
    }

    #[test]
    fn test_validate_price() {
        assert!(matches!(
            form("Book", "free", "Long enough").validate(),
            Err(ValidationError::InvalidPrice(_))
        ));
        assert!(matches!(
            form("Book", "-2", "Long enough").validate(),
            Err(ValidationError::InvalidPrice(_))
        ));
        assert!(matches!(
            form("Book", "1.234", "Long enough").validate(),
            Err(ValidationError::InvalidPrice(_))
        ));
        assert_eq!(
            form("Book", "100000000000", "Long enough").validate(),
            Err(ValidationError::InvalidPrice(PriceError::TooLarge))
        );
        assert!(form("Book", "9999999999.99", "Long enough").validate().is_ok());
    }

    #[test]
    fn test_validate_description_bounds() {
        assert_eq!(
            form("Book", "1", "abcd").validate(),
            Err(ValidationError::DescriptionLength)
        );
        assert!(form("Book", "1", "abcde").validate().is_ok());
        assert!(form("Book", "1", &"x".repeat(400)).validate().is_ok());
        assert_eq!(
            form("Book", "1", &"x".repeat(401)).validate(),
            Err(ValidationError::DescriptionLength)
        );
    }

    #[test]
    fn test_image_url() {
        let product = Product {
            id: ProductId::new(1),
            owner_id: UserId::new(1),
            title: "Book".to_string(),
            price: Price::parse("1").unwrap(),
            description: "A book".to_string(),
            image: "2024-01-01T00-00-00.000Z-book.png".to_string(),
        };
        assert_eq!(product.image_url(), "/images/2024-01-01T00-00-00.000Z-book.png");
        assert!(product.is_owned_by(UserId::new(1)));
        assert!(!product.is_owned_by(UserId::new(2)));
    }
}
