// Conversion of carrier SOAP responses into tracking data
use crate::config::NotReadySignals;
use crate::dictionary::{enrich_batch_operation, enrich_history_record};
use crate::error::TrackingError;
use crate::masking::log_preview;
use crate::model::{
    BatchItem, BatchOperation, BatchResult, BatchTicket, HeaderError, Location, OperationCode,
    TrackingRecord,
};
use crate::xml::XmlNode;
use chrono::DateTime;
use tracing::{debug, error, info, warn};

// Parser-detected faults have no HTTP status of their own; the facade answers 502.
const FAULT_STATUS: u16 = 502;

// SOAP 1.1 (`faultcode`/`faultstring`) or 1.2 (`Code/Value`, `Reason/Text`) fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: Option<String>,
    pub reason: Option<String>,
}

impl SoapFault {
    pub fn from_body(body: &XmlNode) -> Option<SoapFault> {
        Self::read(body, false)
    }

    // The batch service is SOAP 1.1, so its own fields win when both are present.
    pub fn from_soap11_body(body: &XmlNode) -> Option<SoapFault> {
        Self::read(body, true)
    }

    fn read(body: &XmlNode, soap11_first: bool) -> Option<SoapFault> {
        let fault = body.child("Fault")?;
        let pick = |soap11: Option<&str>, soap12: Option<&str>| {
            let (first, second) = if soap11_first { (soap11, soap12) } else { (soap12, soap11) };
            first.or(second).map(str::to_string)
        };
        Some(SoapFault {
            code: pick(fault.field("faultcode"), fault.field_at(&["Code", "Value"])),
            reason: pick(fault.field("faultstring"), fault.field_at(&["Reason", "Text"])),
        })
    }

    // None for non-XML bodies too.
    pub fn from_document(xml: &str) -> Option<SoapFault> {
        let root = XmlNode::parse(xml).ok()?;
        SoapFault::from_body(root.child("Body")?)
    }

    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("Unknown Fault")
    }

    pub fn code_or_default(&self) -> &str {
        self.code.as_deref().unwrap_or("Code N/A")
    }
}

fn parse_code(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|value| value.trim().parse().ok())
}

fn owned(raw: Option<&str>) -> Option<String> {
    raw.map(str::to_string)
}

fn location_at(record: &XmlNode, address: &str) -> Location {
    Location {
        index: owned(record.field_at(&["AddressParameters", address, "Index"])),
        description: owned(record.field_at(&["AddressParameters", address, "Description"])),
    }
}

fn history_record(node: &XmlNode) -> TrackingRecord {
    let operation_date = owned(node.field_at(&["OperationParameters", "OperDate"]));
    let timestamp = operation_date
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok());
    let destination = Some(location_at(node, "DestinationAddress")).filter(|l| !l.is_empty());

    TrackingRecord {
        barcode: node
            .field_at(&["ItemParameters", "Barcode"])
            .unwrap_or_default()
            .to_string(),
        operation_type: OperationCode::new(
            parse_code(node.field_at(&["OperationParameters", "OperType", "Id"])),
            owned(node.field_at(&["OperationParameters", "OperType", "Name"])),
        ),
        operation_attr: OperationCode::new(
            parse_code(node.field_at(&["OperationParameters", "OperAttr", "Id"])),
            owned(node.field_at(&["OperationParameters", "OperAttr", "Name"])),
        ),
        operation_date,
        timestamp,
        location: location_at(node, "OperationAddress"),
        destination,
        item_name: owned(node.field_at(&["ItemParameters", "ComplexItemName"])),
        mass: parse_code(node.field_at(&["ItemParameters", "Mass"])),
        mail_type: owned(node.field_at(&["ItemParameters", "MailType", "Name"])),
        mail_category: owned(node.field_at(&["ItemParameters", "MailCtg", "Name"])),
        sender: owned(node.field_at(&["UserParameters", "Sndr"])),
        recipient: owned(node.field_at(&["UserParameters", "Rcpn"])),
    }
}

fn batch_operation(node: &XmlNode) -> BatchOperation {
    BatchOperation {
        oper_type: OperationCode::new(parse_code(node.field("OperTypeID")), None),
        oper_ctg: OperationCode::new(parse_code(node.field("OperCtgID")), None),
        oper_name: owned(node.field("OperName")),
        date_oper: owned(node.field("DateOper")),
        index_oper: owned(node.field("IndexOper")),
    }
}

// Error elements carry their message either as ErrorName or as plain text.
fn error_name(node: &XmlNode) -> Option<&str> {
    node.field("ErrorName").or_else(|| node.text())
}

pub struct TrackingResponseParser {
    not_ready: NotReadySignals,
}

impl Default for TrackingResponseParser {
    fn default() -> Self {
        Self::new(NotReadySignals::default())
    }
}

impl TrackingResponseParser {
    pub fn new(not_ready: NotReadySignals) -> Self {
        Self { not_ready }
    }

    fn envelope(&self, xml: &str, kind: &str) -> Result<XmlNode, TrackingError> {
        if xml.trim().is_empty() {
            return Err(TrackingError::parsing(format!(
                "Invalid or empty input to {kind} parser."
            )));
        }
        debug!(kind, preview = %log_preview(xml), "parsing_response");

        let root = XmlNode::parse(xml)?;
        if root.name != "Envelope" {
            return Err(TrackingError::parsing(
                "Invalid SOAP structure: Missing 'Envelope' object.",
            ));
        }
        Ok(root)
    }

    fn body<'a>(root: &'a XmlNode) -> Result<&'a XmlNode, TrackingError> {
        root.child("Body")
            .ok_or_else(|| TrackingError::parsing("Invalid SOAP structure: Missing Envelope/Body."))
    }

    // `getOperationHistoryResponse/OperationHistoryData/historyRecord`, enriched.
    pub fn parse_single_history(&self, xml: &str) -> Result<Vec<TrackingRecord>, TrackingError> {
        let root = self.envelope(xml, "single")?;
        let body = Self::body(&root)?;

        if let Some(fault) = SoapFault::from_body(body) {
            return Err(TrackingError::api(
                FAULT_STATUS,
                format!("API Error: {}", fault.reason_or_default()),
            ));
        }

        let Some(history) = body.path(&["getOperationHistoryResponse", "OperationHistoryData"])
        else {
            info!("no_history_data_in_single_response");
            return Ok(Vec::new());
        };

        let records: Vec<TrackingRecord> = history
            .elements("historyRecord")
            .map(history_record)
            .map(enrich_history_record)
            .collect();

        info!(records = records.len(), "parsed_single_history");
        Ok(records)
    }

    // `ticketResponse/value` (or `getTicketResponse/value`) as a plain string.
    pub fn parse_ticket(&self, xml: &str) -> Result<BatchTicket, TrackingError> {
        let root = self.envelope(xml, "ticket")?;
        let body = Self::body(&root)?;

        if let Some(fault) = SoapFault::from_body(body) {
            return Err(TrackingError::api(
                FAULT_STATUS,
                format!("API Error: {}", fault.reason_or_default()),
            ));
        }

        let response = body
            .child("ticketResponse")
            .or_else(|| body.child("getTicketResponse"));
        let value = response
            .and_then(|r| r.child("value"))
            .filter(|v| v.is_leaf())
            .and_then(XmlNode::text);

        match value {
            Some(ticket) => {
                info!(ticket, "parsed_ticket");
                Ok(BatchTicket::new(ticket))
            }
            None => {
                let reported = response
                    .and_then(|r| r.child("error"))
                    .and_then(error_name)
                    .map(|name| format!(" Carrier reported: {name}"))
                    .unwrap_or_default();
                Err(TrackingError::parsing(format!(
                    "Failed to extract ticket ID string.{reported}"
                )))
            }
        }
    }

    // `answerByTicketResponse`: partitions items into successes and per-barcode errors.
    pub fn parse_batch_status(&self, xml: &str) -> Result<BatchResult, TrackingError> {
        let root = self.envelope(xml, "batch status")?;
        let body = Self::body(&root)?;

        if let Some(fault) = SoapFault::from_soap11_body(body) {
            let reason = fault.reason.as_deref().unwrap_or("Unknown SOAP Fault");
            if self.not_ready.matches_message(reason) {
                debug!(reason, "batch_not_ready_fault");
                return Err(TrackingError::BatchNotReady);
            }
            return Err(TrackingError::api(
                FAULT_STATUS,
                format!("API Error ({}): {}", fault.code_or_default(), reason),
            ));
        }

        let response = body
            .child("answerByTicketResponse")
            .ok_or_else(|| TrackingError::parsing("Missing answerByTicketResponse element."))?;

        let mut result = BatchResult::default();

        if let Some(header) = response.child("error") {
            let error_id = header.field("ErrorTypeID");
            let name = error_name(header);
            let id_matches = error_id.is_some_and(|id| self.not_ready.matches_error_id(id));
            let name_matches = name.is_some_and(|n| self.not_ready.matches_message(n));
            if id_matches || name_matches {
                debug!(?error_id, ?name, "batch_not_ready_error_element");
                return Err(TrackingError::BatchNotReady);
            }

            let header_error = HeaderError {
                error_id: error_id.unwrap_or("Unknown ID").to_string(),
                error_name: name.unwrap_or("?").to_string(),
            };
            error!(
                error_id = %header_error.error_id,
                error_name = %header_error.error_name,
                "batch_response_header_error"
            );
            result.header_error = Some(header_error);
        }

        let Some(value) = response.child("value") else {
            info!("batch_status_without_items");
            return Ok(result);
        };

        for (index, item) in value.elements("Item").enumerate() {
            let Some(barcode) = item.field("Barcode").map(str::trim).filter(|b| !b.is_empty())
            else {
                warn!(index, "batch_item_missing_barcode");
                continue;
            };

            if let Some(item_error) = item.child("Error") {
                let message = error_name(item_error).unwrap_or("?").to_string();
                warn!(barcode, error = %message, "batch_item_error");
                result.record_error(barcode.to_string(), message);
                continue;
            }

            let operations = item
                .elements("Operation")
                .map(batch_operation)
                .map(enrich_batch_operation)
                .collect();
            let accepted = result.record_success(BatchItem {
                barcode: barcode.to_string(),
                operations,
            });
            if !accepted {
                warn!(barcode, "batch_item_success_ignored_after_error");
            }
        }

        debug!(
            success = result.success_items.len(),
            errors = result.error_messages.len(),
            "parsed_batch_status"
        );
        Ok(result)
    }
}

// Sample responses used across the crate's tests.
#[cfg(test)]
pub(crate) mod samples {
    pub const TICKET_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <ticketResponse>
      <value>ABC-123</value>
    </ticketResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

    pub const BATCH_STATUS_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <ns3:answerByTicketResponse xmlns:ns3="http://fclient.russianpost.org/postserver" xmlns:ns2="http://fclient.russianpost.org">
      <value>
        <ns2:Item Barcode="1">
          <ns2:Operation OperTypeID="2" OperCtgID="1" OperName="Вручение" DateOper="16.11.2023 12:30:00" IndexOper="101000"/>
        </ns2:Item>
        <ns2:Item Barcode="2">
          <ns2:Error ErrorTypeID="3" ErrorName="Barcode not found"/>
        </ns2:Item>
      </value>
    </ns3:answerByTicketResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

    pub const NOT_READY_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/">
  <S:Body>
    <S:Fault>
      <faultcode>S:Server</faultcode>
      <faultstring>Ответ для ФК еще не готов</faultstring>
    </S:Fault>
  </S:Body>
</S:Envelope>"#;

    pub const SINGLE_HISTORY_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<S:Envelope xmlns:S="http://www.w3.org/2003/05/soap-envelope">
  <S:Body>
    <ns7:getOperationHistoryResponse xmlns:ns3="http://russianpost.org/operationhistory/data" xmlns:ns7="http://russianpost.org/operationhistory">
      <ns3:OperationHistoryData>
        <ns3:historyRecord>
          <ns3:AddressParameters>
            <ns3:DestinationAddress>
              <ns3:Index>630000</ns3:Index>
              <ns3:Description>Новосибирск</ns3:Description>
            </ns3:DestinationAddress>
            <ns3:OperationAddress>
              <ns3:Index>101000</ns3:Index>
              <ns3:Description>Москва Почтамт</ns3:Description>
            </ns3:OperationAddress>
          </ns3:AddressParameters>
          <ns3:ItemParameters>
            <ns3:Barcode>80081234567890</ns3:Barcode>
            <ns3:ComplexItemName>Посылка стандарт</ns3:ComplexItemName>
            <ns3:Mass>1250</ns3:Mass>
          </ns3:ItemParameters>
          <ns3:OperationParameters>
            <ns3:OperType>
              <ns3:Id>1</ns3:Id>
              <ns3:Name>Прием</ns3:Name>
            </ns3:OperType>
            <ns3:OperAttr>
              <ns3:Id>1</ns3:Id>
            </ns3:OperAttr>
            <ns3:OperDate>2023-11-14T10:15:00.000+03:00</ns3:OperDate>
          </ns3:OperationParameters>
          <ns3:UserParameters>
            <ns3:Sndr>ООО Ромашка</ns3:Sndr>
            <ns3:Rcpn>Иванов И.И.</ns3:Rcpn>
          </ns3:UserParameters>
        </ns3:historyRecord>
      </ns3:OperationHistoryData>
    </ns7:getOperationHistoryResponse>
  </S:Body>
</S:Envelope>"#;
}
