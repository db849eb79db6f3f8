mod consumer;
mod owner;
mod product;
mod role;
mod user;

pub use consumer::*;
pub use owner::*;
pub use product::*;
pub use role::*;
pub use user::*;
