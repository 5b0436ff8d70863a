pub mod appointment;
pub mod capacity;
pub mod patient;
pub mod rut;
pub mod session;
