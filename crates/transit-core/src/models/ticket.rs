use serde::{Deserialize, Serialize};

/// Ticket record as the ticket service returns it.
///
/// Values are kept exactly as received (including `valid_until`) so the
/// validator can display them without transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub ticket_type: String,
    pub status: String,
    pub usage_count: i64,
    pub max_usage: i64,
    pub valid_until: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<i64>,
    /// Any further fields the server sends
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Ticket {
    pub fn usage_label(&self) -> String {
        format!("{} / {}", self.usage_count, self.max_usage)
    }
}

/// Body of `POST /tickets/validate`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTicket {
    pub qr_code: String,
    pub route_id: i64,
    pub controller_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<i64>,
}

/// Result of a validation attempt. `valid == false` is a normal outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ticket: Option<Ticket>,
}

impl ValidationOutcome {
    pub fn headline(&self) -> &'static str {
        if self.valid {
            "VALID TICKET"
        } else {
            "INVALID TICKET"
        }
    }

    /// Label/value rows of the ticket details card
    pub fn detail_rows(&self) -> Vec<(&'static str, String)> {
        let Some(ticket) = &self.ticket else {
            return Vec::new();
        };

        let mut rows = vec![
            ("Type", ticket.ticket_type.clone()),
            ("Status", ticket.status.clone()),
            ("Usage", ticket.usage_label()),
            ("Valid Until", ticket.valid_until.clone()),
        ];
        if let Some(name) = &ticket.passenger_name {
            rows.push(("Passenger", name.clone()));
        }
        rows
    }
}
