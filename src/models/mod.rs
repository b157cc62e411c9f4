pub mod internal;
pub mod message;
