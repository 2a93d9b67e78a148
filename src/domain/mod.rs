pub mod buyable;
pub mod cart;
pub mod charge;
pub mod membership;
pub mod reservation;
pub mod token;
pub mod user;

pub use buyable::*;
pub use cart::*;
pub use charge::*;
pub use membership::*;
pub use reservation::*;
pub use token::*;
pub use user::*;
