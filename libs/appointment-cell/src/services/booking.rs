// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::{debug, error, info};

use doctor_cell::{DoctorMatchingService, HospitalDirectory};

use crate::models::{
    AppointmentError, BookingRequest, BookingSettings, Deadline, ScheduledVisit, TimeSlot, VisitCandidate, VisitRow,
};
use crate::services::amplimed::AmplimedClient;
use crate::services::visit_row::VisitRowWriter;

/// Books one visit at a time: resolves the Amplimed ids, validates the
/// deadline, submits the appointment and records it in the visits tab.
pub struct BookingService<C> {
    hospitals: Arc<HospitalDirectory>,
    matching: DoctorMatchingService,
    client: C,
    writer: VisitRowWriter,
    settings: BookingSettings,
    rng: StdRng,
}

impl<C: AmplimedClient> BookingService<C> {
    pub fn new(
        hospitals: Arc<HospitalDirectory>,
        matching: DoctorMatchingService,
        client: C,
        writer: VisitRowWriter,
        settings: BookingSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            hospitals,
            matching,
            client,
            writer,
            settings,
            rng,
        }
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn next_visit_row(&self) -> u32 {
        self.writer.next_row()
    }

    /// Stops at the first step that fails; nothing is submitted or written
    /// for a visit that fails before the booking step.
    pub async fn process_visit(&mut self, candidate: &VisitCandidate) -> Result<ScheduledVisit, AppointmentError> {
        // Step 1: hospital
        let hospital_id = self
            .hospitals
            .amplimed_id(&candidate.hospital_code)
            .map(str::to_string)
            .ok_or_else(|| AppointmentError::HospitalNotFound(candidate.hospital_code.clone()))?;

        // Step 2: doctor
        let doctor_cpf = self
            .matching
            .assign(&candidate.hospital_code, &candidate.assignment(), &mut self.rng)?;

        let directory = self.matching.directory();
        let doctor_id = directory
            .amplimed_id_by_cpf(&doctor_cpf)
            .map(str::to_string)
            .ok_or_else(|| AppointmentError::DoctorNotFound(doctor_cpf.clone()))?;
        let doctor_name = directory
            .name_by_cpf(&doctor_cpf)
            .map(str::to_string)
            .ok_or_else(|| AppointmentError::DoctorNotFound(doctor_cpf.clone()))?;
        debug!("Assigned doctor {} ({})", doctor_name, doctor_id);

        // Step 3: deadline
        let date = Deadline::parse(&candidate.deadline)?;

        // Step 4: booking
        let mut request = BookingRequest {
            patient_id: candidate.patient_amplimed_id.clone(),
            doctor_id,
            hospital_id,
            slot: TimeSlot::random(
                self.settings.min_schedule_hour,
                self.settings.max_schedule_hour,
                &mut self.rng,
            ),
            date,
            procedure_id: self.settings.procedure_id.clone(),
            insurer_id: self.settings.insurer_id.clone(),
        };

        if let Some(staging) = &self.settings.staging {
            debug!("Staging: replacing patient, doctor and hospital ids");
            request.patient_id = staging.patient_id.clone();
            request.doctor_id = staging.doctor_id.clone();
            request.hospital_id = staging.hospital_id.clone();
        }

        info!(
            "Visit on {} from {} to {}",
            request.date.to_amplimed(),
            request.slot.start(),
            request.slot.end()
        );

        let amplimed_response = if self.settings.dry_run {
            info!("[dry run] Would submit: {}", request.encode()?);
            None
        } else {
            Some(self.client.create_appointment(&request).await?)
        };

        let mut visit = ScheduledVisit {
            kind: candidate.kind,
            carteirinha: candidate.carteirinha.clone(),
            doctor_name: doctor_name.clone(),
            date: request.date.to_amplimed(),
            start: request.slot.start(),
            end: request.slot.end(),
            visit_row: self.writer.next_row(),
            amplimed_response,
        };

        // Step 5: visits tab
        let written = self
            .writer
            .append(&VisitRow {
                carteirinha: candidate.carteirinha.clone(),
                in_hospital_stay_code: candidate.in_hospital_stay_code.clone(),
                deadline: candidate.deadline.clone(),
                doctor_name,
            })
            .await;

        match written {
            Ok(row) => {
                visit.visit_row = row;
                Ok(visit)
            }
            Err(source) => {
                let err = AppointmentError::NotRecorded {
                    visit: Box::new(visit),
                    source,
                };
                error!("{}", err);
                Err(err)
            }
        }
    }
}
