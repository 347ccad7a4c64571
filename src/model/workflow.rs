use serde::{Deserialize, Serialize};

use crate::model::history::Snapshot;

/// Destinations the workshop stage can derive to. A closed set: invalid
/// destinations are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkshopRoute {
    Deposit,
    Logistics,
    OnSiteInstall,
    CustomerPickup,
}

impl WorkshopRoute {
    /// The stage id the route advances to.
    pub fn stage_id(self) -> &'static str {
        match self {
            WorkshopRoute::Deposit => "deposit",
            WorkshopRoute::Logistics => "logistics",
            WorkshopRoute::OnSiteInstall => "on-site-install",
            WorkshopRoute::CustomerPickup => "customer-pickup",
        }
    }

    pub fn all() -> [WorkshopRoute; 4] {
        [
            WorkshopRoute::Deposit,
            WorkshopRoute::Logistics,
            WorkshopRoute::OnSiteInstall,
            WorkshopRoute::CustomerPickup,
        ]
    }

    pub fn parse(s: &str) -> Option<WorkshopRoute> {
        match s {
            "deposit" => Some(WorkshopRoute::Deposit),
            "logistics" => Some(WorkshopRoute::Logistics),
            "on-site-install" => Some(WorkshopRoute::OnSiteInstall),
            "customer-pickup" => Some(WorkshopRoute::CustomerPickup),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkshopRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stage_id())
    }
}

/// The "send to next stage" decision on a sub-record. Only `Yes` moves
/// the project; `No` and `InReview` persist data in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Advance {
    Yes,
    #[default]
    No,
    InReview,
}

impl Advance {
    pub fn parse(s: &str) -> Option<Advance> {
        match s {
            "yes" => Some(Advance::Yes),
            "no" => Some(Advance::No),
            "in-review" => Some(Advance::InReview),
            _ => None,
        }
    }
}

/// The per-stage sub-document of a project: stage-specific fields, its
/// attachment list, the assigned technician, and the advance decision.
/// `route` is only meaningful on the workshop stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubRecord {
    #[serde(default, skip_serializing_if = "Snapshot::is_empty")]
    pub fields: Snapshot,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub advance: Advance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<WorkshopRoute>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn route_serde_is_kebab_case() {
        let json = serde_json::to_string(&WorkshopRoute::OnSiteInstall).unwrap();
        assert_eq!(json, "\"on-site-install\"");
        let back: WorkshopRoute = serde_json::from_str("\"customer-pickup\"").unwrap();
        assert_eq!(back, WorkshopRoute::CustomerPickup);
    }

    #[test]
    fn route_parse_matches_stage_ids() {
        for route in WorkshopRoute::all() {
            assert_eq!(WorkshopRoute::parse(route.stage_id()), Some(route));
        }
        assert_eq!(WorkshopRoute::parse("warehouse"), None);
    }

    #[test]
    fn advance_defaults_to_no() {
        let record = SubRecord::default();
        assert_eq!(record.advance, Advance::No);
    }

    #[test]
    fn advance_parse() {
        assert_eq!(Advance::parse("yes"), Some(Advance::Yes));
        assert_eq!(Advance::parse("in-review"), Some(Advance::InReview));
        assert_eq!(Advance::parse("maybe"), None);
    }
}
