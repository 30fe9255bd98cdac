pub mod code;
pub use self::code::{code, secret};

pub mod health;
pub use self::health::health;

pub mod page;
pub use self::page::page;
