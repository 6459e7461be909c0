//! Cart snapshot types.
//!
//! The place-order engine never works on a live cart. It carries an owned
//! snapshot that states replace as the cart gets reserved, completed or closed.
//! Pricing is out of scope here: the grand total is the sum of the line totals.

pub mod cart;
pub mod money;
pub mod validation;

pub use cart::{Cart, CartItem, CartStatus, PaymentSelection, PlacedOrder};
pub use money::Money;
pub use validation::ValidationResult;
