pub mod ids;
pub mod price;
pub mod timestamp;
pub mod position;
