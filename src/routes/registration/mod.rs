mod handler;
mod model;

pub use handler::{cancel_registration, list_my_registrations, register_visit};
pub use model::{
    CancelRegistrationRequest, CancelRegistrationResponse, CreateRegistrationRequest,
    CreateRegistrationResponse, MyRegistration, SessionSummary,
};
