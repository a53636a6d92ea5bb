//! HTTP request handlers.

pub mod capabilities;
pub mod content;
pub mod health;
pub mod uploads;

pub use capabilities::*;
pub use content::*;
pub use health::*;
pub use uploads::*;
