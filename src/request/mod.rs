pub mod generator;
mod request;

pub use generator::RequestGenerator;
pub use request::Request;
