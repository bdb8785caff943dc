pub mod checkpoint;
pub mod color;
pub mod message;
pub mod packet;
pub mod point;
