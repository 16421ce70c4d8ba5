pub mod destinations;
pub mod extract;
pub mod feedback;
pub mod health;
pub mod metrics;
pub mod seed;
pub mod users;

pub use extract::ApiJson;
