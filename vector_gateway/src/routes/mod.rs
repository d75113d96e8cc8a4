pub mod health_check;
pub mod invoke;

pub use health_check::health_check;
pub use invoke::invoke;
