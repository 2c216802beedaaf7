mod handler;

pub use handler::me;
