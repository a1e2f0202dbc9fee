use std::sync::Arc;

use tracing::{info, warn};

use shared_database::{GoogleSheetsClient, SheetsError};

use crate::models::{VisitRow, VISIT_STATUS_SCHEDULED};

/// Appends booked visits to the visits tab, one cell at a time, starting at
/// the first free row.
pub struct VisitRowWriter {
    sheets: Arc<GoogleSheetsClient>,
    spreadsheet_id: String,
    sheet_name: String,
    next_row: u32,
    dry_run: bool,
}

impl VisitRowWriter {
    pub fn new(
        sheets: Arc<GoogleSheetsClient>,
        spreadsheet_id: &str,
        sheet_name: &str,
        next_row: u32,
        dry_run: bool,
    ) -> Self {
        Self {
            sheets,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            next_row,
            dry_run,
        }
    }

    pub fn next_row(&self) -> u32 {
        self.next_row
    }

    /// Writes the row and returns the spreadsheet row it landed on. A row
    /// left partly written is not reused.
    pub async fn append(&mut self, row: &VisitRow) -> Result<u32, SheetsError> {
        let cells = [
            ("B", row.carteirinha.as_str()),
            ("C", row.in_hospital_stay_code.as_str()),
            ("I", row.deadline.as_str()),
            ("J", row.doctor_name.as_str()),
            ("K", VISIT_STATUS_SCHEDULED),
        ];

        let row_number = self.next_row;
        let mut written = 0;

        for (column, value) in cells {
            let range = format!("{}!{}{}", self.sheet_name, column, self.next_row);

            if self.dry_run {
                info!("[dry run] Would set {} to {:?}", range, value);
                continue;
            }

            if let Err(e) = self.sheets.update_cell(&self.spreadsheet_id, &range, value).await {
                if written > 0 {
                    warn!("Row {} left partly written; continuing at row {}", row_number, row_number + 1);
                    self.next_row += 1;
                }
                return Err(e);
            }
            written += 1;
            info!("Set {} to {:?}", range, value);
        }

        self.next_row += 1;
        Ok(row_number)
    }
}
