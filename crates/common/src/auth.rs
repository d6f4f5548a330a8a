mod config;
mod jwt;
mod login;
mod password;
mod rbac_catalog;
mod traits;

pub use config::*;
pub use jwt::*;
pub use login::*;
pub use password::*;
pub use rbac_catalog::*;
pub use traits::*;
