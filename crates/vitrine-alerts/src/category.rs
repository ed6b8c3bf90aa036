//! Static per-type alert configuration.

use serde::Serialize;
use std::collections::BTreeMap;

use super::alert::{AlertPriority, AlertType};

/// Display and policy settings for one alert type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTypeDescriptor {
    pub name: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub auto_actions: &'static [&'static str],
    pub escalation_delay_ms: u64,
}

const MINUTE_MS: u64 = 60_000;

impl AlertType {
    /// The built-in descriptor of this type.
    pub fn descriptor(&self) -> AlertTypeDescriptor {
        match self {
            Self::Security => AlertTypeDescriptor {
                name: "Sécurité",
                color: "#dc2626",
                icon: "shield-alert",
                auto_actions: &["notify_admins", "log_security_event", "block_suspicious_ip"],
                escalation_delay_ms: 5 * MINUTE_MS,
            },
            Self::System => AlertTypeDescriptor {
                name: "Système",
                color: "#ea580c",
                icon: "server",
                auto_actions: &["notify_admins", "check_system_health"],
                escalation_delay_ms: 10 * MINUTE_MS,
            },
            Self::Business => AlertTypeDescriptor {
                name: "Commercial",
                color: "#2563eb",
                icon: "briefcase",
                auto_actions: &["notify_managers"],
                escalation_delay_ms: 30 * MINUTE_MS,
            },
            Self::Inventory => AlertTypeDescriptor {
                name: "Stock",
                color: "#7c3aed",
                icon: "package",
                auto_actions: &["notify_inventory_team", "check_stock_levels"],
                escalation_delay_ms: 60 * MINUTE_MS,
            },
            Self::Financial => AlertTypeDescriptor {
                name: "Financier",
                color: "#059669",
                icon: "credit-card",
                auto_actions: &["notify_finance_team", "audit_transaction"],
                escalation_delay_ms: 15 * MINUTE_MS,
            },
            Self::Customer => AlertTypeDescriptor {
                name: "Client",
                color: "#0891b2",
                icon: "users",
                auto_actions: &["notify_customer_service"],
                escalation_delay_ms: 30 * MINUTE_MS,
            },
            Self::Operational => AlertTypeDescriptor {
                name: "Opérationnel",
                color: "#ca8a04",
                icon: "settings",
                auto_actions: &["notify_operations"],
                escalation_delay_ms: 30 * MINUTE_MS,
            },
            Self::Performance => AlertTypeDescriptor {
                name: "Performance",
                color: "#db2777",
                icon: "activity",
                auto_actions: &["notify_admins", "collect_performance_metrics"],
                escalation_delay_ms: 15 * MINUTE_MS,
            },
        }
    }

    /// Canned title, message and priority used by the test-alert endpoint.
    pub fn sample(&self) -> (&'static str, &'static str, AlertPriority) {
        match self {
            Self::Security => (
                "Tentatives de connexion suspectes",
                "Plusieurs échecs de connexion détectés depuis la même adresse IP",
                AlertPriority::High,
            ),
            Self::System => (
                "Erreur système",
                "Le service de synchronisation Sage ne répond plus",
                AlertPriority::High,
            ),
            Self::Business => (
                "Commande importante",
                "Une commande supérieure à 10 000 € vient d'être passée",
                AlertPriority::Medium,
            ),
            Self::Inventory => (
                "Stock faible",
                "Plusieurs produits sont sous le seuil de réapprovisionnement",
                AlertPriority::Medium,
            ),
            Self::Financial => (
                "Paiement refusé",
                "Un paiement client a été refusé par la banque",
                AlertPriority::High,
            ),
            Self::Customer => (
                "Réclamation client",
                "Un client a signalé un problème de livraison",
                AlertPriority::Low,
            ),
            Self::Operational => (
                "Retard d'expédition",
                "Des commandes validées ne sont pas expédiées depuis 48h",
                AlertPriority::Medium,
            ),
            Self::Performance => (
                "Temps de réponse élevé",
                "Le temps de réponse moyen de l'API dépasse 2 secondes",
                AlertPriority::Medium,
            ),
        }
    }
}

/// Descriptor table keyed by type name, as served by the types endpoint.
pub fn descriptor_table() -> BTreeMap<&'static str, AlertTypeDescriptor> {
    AlertType::ALL
        .iter()
        .map(|t| (t.as_str(), t.descriptor()))
        .collect()
}
