// SOAP request envelopes for the carrier's tracking services.
//
// Envelopes are serialized through quick-xml's serde serializer, so login,
// password, barcodes and tickets are always XML-escaped.
use crate::error::TrackingError;
use serde::Serialize;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

const SOAP12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const SOAP11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const OPERATION_HISTORY_NS: &str = "http://russianpost.org/operationhistory";
const OPERATION_HISTORY_DATA_NS: &str = "http://russianpost.org/operationhistory/data";
const POSTSERVER_NS: &str = "http://fclient.russianpost.org/postserver";
const FCLIENT_NS: &str = "http://fclient.russianpost.org";

pub const HISTORY_MESSAGE_TYPE: u8 = 0;
pub const LANGUAGE: &str = "RUS";

// --- Single history (SOAP 1.2) ---

#[derive(Serialize)]
#[serde(rename = "soap:Envelope")]
struct HistoryEnvelope<'a> {
    #[serde(rename = "@xmlns:soap")]
    soap_ns: &'static str,
    #[serde(rename = "@xmlns:oper")]
    oper_ns: &'static str,
    #[serde(rename = "@xmlns:data")]
    data_ns: &'static str,
    #[serde(rename = "soap:Header")]
    header: (),
    #[serde(rename = "soap:Body")]
    body: HistoryBody<'a>,
}

#[derive(Serialize)]
struct HistoryBody<'a> {
    #[serde(rename = "oper:getOperationHistory")]
    operation: GetOperationHistory<'a>,
}

#[derive(Serialize)]
struct GetOperationHistory<'a> {
    #[serde(rename = "data:OperationHistoryRequest")]
    request: OperationHistoryRequest<'a>,
    #[serde(rename = "data:AuthorizationHeader")]
    authorization: AuthorizationHeader<'a>,
}

#[derive(Serialize)]
struct OperationHistoryRequest<'a> {
    #[serde(rename = "data:Barcode")]
    barcode: &'a str,
    #[serde(rename = "data:MessageType")]
    message_type: u8,
    #[serde(rename = "data:Language")]
    language: &'static str,
}

#[derive(Serialize)]
struct AuthorizationHeader<'a> {
    #[serde(rename = "@soap:mustUnderstand")]
    must_understand: u8,
    #[serde(rename = "data:login")]
    login: &'a str,
    #[serde(rename = "data:password")]
    password: &'a str,
}

// --- Batch ticket and ticket status (SOAP 1.1) ---

#[derive(Serialize)]
#[serde(rename = "soapenv:Envelope")]
struct TicketEnvelope<'a> {
    #[serde(rename = "@xmlns:soapenv")]
    soapenv_ns: &'static str,
    #[serde(rename = "@xmlns:pos")]
    pos_ns: &'static str,
    #[serde(rename = "@xmlns:fcl")]
    fcl_ns: &'static str,
    #[serde(rename = "soapenv:Header")]
    header: (),
    #[serde(rename = "soapenv:Body")]
    body: TicketBody<'a>,
}

#[derive(Serialize)]
struct TicketBody<'a> {
    #[serde(rename = "pos:ticketRequest")]
    ticket_request: TicketRequest<'a>,
}

#[derive(Serialize)]
struct TicketRequest<'a> {
    request: BarcodeList<'a>,
    login: &'a str,
    password: &'a str,
    language: &'static str,
}

#[derive(Serialize)]
struct BarcodeList<'a> {
    #[serde(rename = "fcl:Item")]
    items: Vec<BarcodeItem<'a>>,
}

#[derive(Serialize)]
struct BarcodeItem<'a> {
    #[serde(rename = "@Barcode")]
    barcode: &'a str,
}

#[derive(Serialize)]
#[serde(rename = "soapenv:Envelope")]
struct StatusEnvelope<'a> {
    #[serde(rename = "@xmlns:soapenv")]
    soapenv_ns: &'static str,
    #[serde(rename = "@xmlns:pos")]
    pos_ns: &'static str,
    #[serde(rename = "soapenv:Header")]
    header: (),
    #[serde(rename = "soapenv:Body")]
    body: StatusBody<'a>,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    #[serde(rename = "pos:answerByTicketRequest")]
    answer_request: AnswerByTicketRequest<'a>,
}

#[derive(Serialize)]
struct AnswerByTicketRequest<'a> {
    ticket: &'a str,
    login: &'a str,
    password: &'a str,
}

// Nothing was parsed yet: a serializer failure can only come from the caller's values.
fn envelope_error(e: impl std::fmt::Display) -> TrackingError {
    TrackingError::InvalidInput(format!("Failed to build request envelope: {e}"))
}

fn to_document<T: Serialize>(envelope: &T) -> Result<String, TrackingError> {
    let body = quick_xml::se::to_string(envelope).map_err(envelope_error)?;
    Ok(format!("{XML_DECLARATION}\n{body}"))
}

pub fn build_single_history_request(
    login: &str,
    password: &str,
    barcode: &str,
) -> Result<String, TrackingError> {
    to_document(&HistoryEnvelope {
        soap_ns: SOAP12_NS,
        oper_ns: OPERATION_HISTORY_NS,
        data_ns: OPERATION_HISTORY_DATA_NS,
        header: (),
        body: HistoryBody {
            operation: GetOperationHistory {
                request: OperationHistoryRequest {
                    barcode,
                    message_type: HISTORY_MESSAGE_TYPE,
                    language: LANGUAGE,
                },
                authorization: AuthorizationHeader {
                    must_understand: 1,
                    login,
                    password,
                },
            },
        },
    })
}

// One `<fcl:Item Barcode="…"/>` per barcode, in input order.
pub fn build_ticket_request<S: AsRef<str>>(
    login: &str,
    password: &str,
    barcodes: &[S],
) -> Result<String, TrackingError> {
    to_document(&TicketEnvelope {
        soapenv_ns: SOAP11_NS,
        pos_ns: POSTSERVER_NS,
        fcl_ns: FCLIENT_NS,
        header: (),
        body: TicketBody {
            ticket_request: TicketRequest {
                request: BarcodeList {
                    items: barcodes
                        .iter()
                        .map(|b| BarcodeItem { barcode: b.as_ref() })
                        .collect(),
                },
                login,
                password,
                language: LANGUAGE,
            },
        },
    })
}

pub fn build_ticket_status_request(
    login: &str,
    password: &str,
    ticket: &str,
) -> Result<String, TrackingError> {
    to_document(&StatusEnvelope {
        soapenv_ns: SOAP11_NS,
        pos_ns: POSTSERVER_NS,
        header: (),
        body: StatusBody {
            answer_request: AnswerByTicketRequest {
                ticket,
                login,
                password,
            },
        },
    })
}
