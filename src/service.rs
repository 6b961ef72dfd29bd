// Tracking operations: validate, build envelope, send, parse
use crate::config::{NotReadySignals, ServiceConfig, ServiceKey};
use crate::envelope::{build_single_history_request, build_ticket_request, build_ticket_status_request};
use crate::error::TrackingError;
use crate::model::{BatchResult, BatchTicket, TrackingRecord};
use crate::parser::TrackingResponseParser;
use crate::transport::{HttpSoapTransport, SoapTransport};
use std::sync::Arc;
use tracing::{error, info, instrument};

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require_credentials(login: &str, password: &str, what: &str) -> Result<(), TrackingError> {
    if is_blank(login) || is_blank(password) {
        return Err(TrackingError::InvalidInput(format!(
            "Login, password and {what} are required."
        )));
    }
    Ok(())
}

fn log_failure(operation: &str, e: &TrackingError) {
    if e.is_not_ready() {
        info!(operation, "batch_not_ready");
    } else {
        error!(operation, error = %e, status = e.status_code(), "tracking_operation_failed");
    }
}

pub struct TrackingService<T> {
    transport: T,
    parser: TrackingResponseParser,
}

pub type HttpTrackingService = TrackingService<HttpSoapTransport>;

impl HttpTrackingService {
    pub fn from_config(config: Arc<ServiceConfig>) -> Self {
        let not_ready = config.not_ready.clone();
        TrackingService::new(HttpSoapTransport::new(config), not_ready)
    }
}

impl<T: SoapTransport> TrackingService<T> {
    pub fn new(transport: T, not_ready: NotReadySignals) -> Self {
        Self {
            transport,
            parser: TrackingResponseParser::new(not_ready),
        }
    }

    #[instrument(skip(self, login, password))]
    pub async fn get_single_history(
        &self,
        login: &str,
        password: &str,
        barcode: &str,
    ) -> Result<Vec<TrackingRecord>, TrackingError> {
        require_credentials(login, password, "barcode")?;
        if is_blank(barcode) {
            return Err(TrackingError::InvalidInput(
                "Login, password and barcode are required.".to_string(),
            ));
        }

        let result = async {
            let envelope = build_single_history_request(login, password, barcode.trim())?;
            let body = self.transport.send(ServiceKey::Single, envelope).await?;
            self.parser.parse_single_history(&body)
        }
        .await;

        match &result {
            Ok(records) => info!(records = records.len(), "single_history_completed"),
            Err(e) => log_failure("get_single_history", e),
        }
        result
    }

    #[instrument(skip(self, login, password, barcodes), fields(count = barcodes.len()))]
    pub async fn request_batch_ticket<S: AsRef<str> + Sync>(
        &self,
        login: &str,
        password: &str,
        barcodes: &[S],
    ) -> Result<BatchTicket, TrackingError> {
        require_credentials(login, password, "a non-empty barcode list")?;
        if barcodes.is_empty() || barcodes.iter().any(|b| is_blank(b.as_ref())) {
            return Err(TrackingError::InvalidInput(
                "Login, password and a non-empty barcode list are required.".to_string(),
            ));
        }

        let result = async {
            let trimmed: Vec<&str> = barcodes.iter().map(|b| b.as_ref().trim()).collect();
            let envelope = build_ticket_request(login, password, &trimmed)?;
            let body = self.transport.send(ServiceKey::Batch, envelope).await?;
            self.parser.parse_ticket(&body)
        }
        .await;

        match &result {
            Ok(ticket) => info!(ticket = %ticket, "batch_ticket_issued"),
            Err(e) => log_failure("request_batch_ticket", e),
        }
        result
    }

    // One poll of a batch. `BatchNotReady` means "ask again later".
    #[instrument(skip(self, login, password))]
    pub async fn poll_batch_result(
        &self,
        login: &str,
        password: &str,
        ticket: &str,
    ) -> Result<BatchResult, TrackingError> {
        require_credentials(login, password, "ticket")?;
        if is_blank(ticket) {
            return Err(TrackingError::InvalidInput(
                "Login, password and ticket are required.".to_string(),
            ));
        }

        let result = async {
            let envelope = build_ticket_status_request(login, password, ticket.trim())?;
            let body = self.transport.send(ServiceKey::Batch, envelope).await?;
            self.parser.parse_batch_status(&body)
        }
        .await;

        match &result {
            Ok(batch) => info!(
                success = batch.success_items.len(),
                errors = batch.error_messages.len(),
                "batch_result_received"
            ),
            Err(e) => log_failure("poll_batch_result", e),
        }
        result
    }
}
