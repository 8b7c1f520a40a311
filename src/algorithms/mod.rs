pub(crate) mod batch;
pub mod common;
pub mod mass;
pub(crate) mod mpx;
pub mod pan;
pub(crate) mod stamp;
pub(crate) mod stmp;
pub(crate) mod stomp;
mod streaming;
