//! Domain models for the shop.
//!
//! These are validated domain objects, separate from database row types.

pub mod cart;
pub mod order;
pub mod page;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLine};
pub use order::{Order, OrderItem};
pub use page::{Page, PageQuery, PageRequest};
pub use product::{NewProduct, Product, ProductChanges, ProductForm, ValidProduct, ValidationError};
pub use session::{FlashKind, FlashMessage, SessionUser, keys as session_keys};
pub use user::{NewUser, User};
