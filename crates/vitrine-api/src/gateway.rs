//! Request validation in front of the alert registry.
//!
//! The registry trusts its input; everything a client sends is checked
//! here first, and registry failures are mapped to HTTP errors here and
//! nowhere else.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use vitrine_alerts::{
    descriptor_table, Alert, AlertId, AlertMetrics, AlertPriority, AlertRegistry, AlertType,
    AlertTypeDescriptor, NewAlert, DEFAULT_HISTORY_LIMIT,
};

use crate::models::{ApiResult, ErrorResponse};

/// Body of `POST /api/alerts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
    pub data: Option<Value>,
    pub user_id: Option<String>,
}

/// Body of `PUT /api/alerts/:id/acknowledge`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    pub user_id: Option<String>,
    pub comment: Option<String>,
}

/// Body of `PUT /api/alerts/:id/resolve`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub user_id: Option<String>,
    pub resolution: Option<String>,
}

/// Body of `PUT /api/alerts/:id/escalate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EscalateRequest {
    pub reason: Option<String>,
}

/// Body of `POST /api/alerts/test`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestAlertRequest {
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
}

/// Query of `GET /api/alerts/history`. Kept as a string so a bad number
/// is reported as a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
}

/// Validating front of the [`AlertRegistry`].
#[derive(Clone)]
pub struct AlertGateway {
    registry: AlertRegistry,
}

impl AlertGateway {
    pub fn new(registry: AlertRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AlertRegistry {
        &self.registry
    }

    pub fn create(&self, req: CreateAlertRequest) -> ApiResult<Alert> {
        let (Some(type_name), Some(title), Some(message)) = (
            non_blank(req.alert_type),
            non_blank(req.title),
            non_blank(req.message),
        ) else {
            return Err(ErrorResponse::validation(
                "Les champs type, title et message sont requis",
            ));
        };

        let alert_type = parse_type(&type_name)?;

        let priority = match non_blank(req.priority) {
            None => AlertPriority::default(),
            Some(p) => AlertPriority::from_string(&p).ok_or_else(|| {
                ErrorResponse::validation(format!(
                    "Priorité invalide: {}. Valeurs acceptées: low, medium, high, critical",
                    p
                ))
            })?,
        };

        let data = match req.data {
            None | Some(Value::Null) => Default::default(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ErrorResponse::validation("Le champ data doit être un objet")),
        };

        let mut new = NewAlert::new(alert_type, title, message)
            .with_priority(priority)
            .with_data(data)
            .with_user(non_blank(req.user_id));
        if let Some(source) = non_blank(req.source) {
            new = new.with_source(source);
        }

        Ok(self.registry.create_alert(new))
    }

    pub fn acknowledge(&self, id: &str, req: AcknowledgeRequest) -> ApiResult<Alert> {
        let user_id = require_user(req.user_id)?;
        self.registry
            .acknowledge_alert(&AlertId::from(id), &user_id, req.comment.as_deref().unwrap_or(""))
            .map_err(registry_error)
    }

    pub fn resolve(&self, id: &str, req: ResolveRequest) -> ApiResult<Alert> {
        let user_id = require_user(req.user_id)?;
        self.registry
            .resolve_alert(&AlertId::from(id), &user_id, req.resolution.as_deref().unwrap_or(""))
            .map_err(registry_error)
    }

    pub fn escalate(&self, id: &str, req: EscalateRequest) -> ApiResult<Alert> {
        self.registry
            .escalate_alert(&AlertId::from(id), req.reason.as_deref().unwrap_or(""))
            .ok_or_else(|| {
                ErrorResponse::not_found(format!("Alerte {} introuvable ou déjà résolue", id))
            })
    }

    pub fn active(&self) -> Vec<Alert> {
        self.registry.active_alerts()
    }

    pub fn history(&self, query: HistoryQuery) -> ApiResult<Vec<Alert>> {
        let limit = match non_blank(query.limit) {
            None => DEFAULT_HISTORY_LIMIT,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ErrorResponse::validation(format!("Paramètre limit invalide: {}", raw))
            })?,
        };
        Ok(self.registry.alert_history(limit))
    }

    pub fn metrics(&self) -> AlertMetrics {
        self.registry.metrics()
    }

    pub fn get(&self, id: &str) -> ApiResult<Alert> {
        self.registry
            .get_alert(&AlertId::from(id))
            .ok_or_else(|| ErrorResponse::not_found(format!("Alerte {} introuvable", id)))
    }

    pub fn types(&self) -> BTreeMap<&'static str, AlertTypeDescriptor> {
        descriptor_table()
    }

    /// Create a canned alert of the requested type (SYSTEM by default).
    pub fn create_test(&self, req: TestAlertRequest) -> ApiResult<Alert> {
        let alert_type = match non_blank(req.alert_type) {
            None => AlertType::System,
            Some(name) => parse_type(&name)?,
        };
        let (title, message, priority) = alert_type.sample();

        Ok(self.registry.create_alert(
            NewAlert::new(alert_type, title, message)
                .with_priority(priority)
                .with_source("test")
                .with_field("test", true),
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_type(name: &str) -> ApiResult<AlertType> {
    AlertType::from_string(name).ok_or_else(|| {
        ErrorResponse::validation(format!(
            "Type d'alerte invalide: {}. Types valides: {}",
            name,
            AlertType::valid_names()
        ))
    })
}

fn require_user(user_id: Option<String>) -> ApiResult<String> {
    non_blank(user_id).ok_or_else(|| ErrorResponse::validation("Le champ userId est requis"))
}

/// NotFound becomes 404; anything else is a 500.
fn registry_error(e: vitrine_alerts::Error) -> ErrorResponse {
    if e.is_not_found() {
        ErrorResponse::not_found(e.to_string())
    } else {
        tracing::error!(category = "alerts", error = %e, "Alert operation failed");
        ErrorResponse::internal(e.to_string())
    }
}
