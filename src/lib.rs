// Tracking proxy for the Russian Post SOAP services

pub mod config;
pub mod dictionary;
pub mod envelope;
pub mod error;
pub mod masking;
pub mod model;
pub mod parser;
pub mod server;
pub mod service;
pub mod transport;
pub mod xml;

// Re-export key types for convenience
pub use config::{NotReadySignals, ServiceConfig, ServiceEndpoint, ServiceKey};
pub use error::{ConfigError, TrackingError};
pub use model::{
    BatchItem, BatchOperation, BatchResult, BatchTicket, HeaderError, Location, OperationCode,
    TrackingRecord,
};
pub use parser::{SoapFault, TrackingResponseParser};
pub use service::{HttpTrackingService, TrackingService};
pub use transport::{HttpSoapTransport, SoapTransport};
