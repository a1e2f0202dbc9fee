use async_trait::async_trait;
use tracing::{debug, info};

use amplimed_cell::AmplimedApi;

use crate::models::{AppointmentError, BookingRequest, CREATE_APPOINTMENT_PATH};

/// Booking submission to Amplimed.
#[async_trait]
pub trait AmplimedClient: Send {
    /// Creates the appointment and returns Amplimed's raw response.
    async fn create_appointment(&mut self, request: &BookingRequest) -> Result<String, AppointmentError>;
}

#[async_trait]
impl<T> AmplimedClient for T
where
    T: AmplimedApi,
{
    async fn create_appointment(&mut self, request: &BookingRequest) -> Result<String, AppointmentError> {
        let body = request.encode()?;

        info!(
            "Booking {} {}-{} (patient {}, doctor {}, hospital {})",
            request.date.to_amplimed(),
            request.slot.start(),
            request.slot.end(),
            request.patient_id,
            request.doctor_id,
            request.hospital_id
        );
        debug!("Booking payload: {}", body);

        let response = self.post_form(CREATE_APPOINTMENT_PATH, &body).await?;
        debug!("Amplimed response: {}", response);
        Ok(response)
    }
}
