// libs/appointment-cell/src/services/mod.rs
pub mod amplimed;
pub mod booking;
pub mod visit_row;

pub use amplimed::AmplimedClient;
pub use booking::BookingService;
pub use visit_row::VisitRowWriter;
