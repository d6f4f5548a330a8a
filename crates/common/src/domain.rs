mod order;
mod permission;
mod result;
mod user;

pub use order::*;
pub use permission::*;
pub use result::*;
pub use user::*;
