pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod errors;
pub mod order;
pub mod ports;
pub mod shipping;
pub mod user;
