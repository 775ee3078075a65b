pub mod responder;
pub mod time_source;
