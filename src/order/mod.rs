mod model;

pub use model::{DeliveredAt, Order, OrderStatus};
