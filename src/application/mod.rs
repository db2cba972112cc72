pub mod checkout_service;
pub mod order_service;
pub mod settlement;

#[cfg(test)]
pub(crate) mod test_utils;
