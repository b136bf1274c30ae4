pub mod assistant;
pub mod product;
pub mod user;

pub use assistant::*;
pub use product::*;
pub use user::*;
