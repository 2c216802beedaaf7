mod handler;

pub use handler::webhook;
