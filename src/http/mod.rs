pub(crate) mod request;
pub(crate) mod response;

pub use request::Request;
pub use response::{reason_phrase, Response};
