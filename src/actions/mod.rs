pub mod alert;
pub mod click;
pub mod dom;
pub mod input;
pub mod locate;
pub mod wait;

pub use locate::Locator;
