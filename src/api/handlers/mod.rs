pub mod carts;
pub mod charges;
pub mod checkout;
pub mod reservations;
pub mod root;
pub mod types;
pub mod webhooks;
