pub mod objects;
pub mod order_number;
pub mod session;
