mod admin;
mod healthcheck;
mod profiles;

pub use admin::*;
pub use healthcheck::*;
pub use profiles::*;
