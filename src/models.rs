use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the documentation corpora served by the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cdp {
    Segment,
    Mparticle,
    Lytics,
    Zeotap,
}

impl Cdp {
    pub const ALL: [Cdp; 4] = [Cdp::Segment, Cdp::Mparticle, Cdp::Lytics, Cdp::Zeotap];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cdp::Segment => "segment",
            Cdp::Mparticle => "mparticle",
            Cdp::Lytics => "lytics",
            Cdp::Zeotap => "zeotap",
        }
    }

    /// Name of the backend index holding this corpus.
    pub fn index_name(&self) -> String {
        format!("{}_docs", self.as_str())
    }
}

impl fmt::Display for Cdp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCdp(pub String);

impl fmt::Display for UnknownCdp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown CDP: {}", self.0)
    }
}

impl std::error::Error for UnknownCdp {}

impl FromStr for Cdp {
    type Err = UnknownCdp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cdp::ALL
            .into_iter()
            .find(|cdp| cdp.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCdp(s.to_string()))
    }
}

// ─── Canonical search result ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetKind {
    Guide,
    #[default]
    Documentation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relevance {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SnippetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub relevance: Relevance,
    pub document_type: String,
    pub headers: Vec<String>,
}

impl Default for ResultMetadata {
    fn default() -> Self {
        Self {
            relevance: Relevance::default(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            headers: Vec::new(),
        }
    }
}

pub const DEFAULT_TITLE: &str = "Search Result";
pub const DEFAULT_DOCUMENT_TYPE: &str = "Documentation";

/// Fully-populated search result handed to rendering. Every field always
/// carries a value; see [`crate::normalize::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub title: String,
    pub snippet: Snippet,
    pub steps: Vec<String>,
    pub link: String,
    pub metadata: ResultMetadata,
    pub suggestions: Vec<String>,
    pub related_topics: Vec<String>,
}

impl Default for CanonicalResult {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            snippet: Snippet::default(),
            steps: Vec::new(),
            link: String::new(),
            metadata: ResultMetadata::default(),
            suggestions: Vec::new(),
            related_topics: Vec::new(),
        }
    }
}

// ─── Health ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHealth {
    pub exists: bool,
    #[serde(default, alias = "document_count")]
    pub document_count: u64,
    #[serde(default, alias = "last_updated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "HealthWire")]
pub struct HealthStatus {
    pub elasticsearch_connected: bool,
    pub timestamp: String,
    pub indices: BTreeMap<String, IndexHealth>,
}

impl HealthStatus {
    pub fn index_for(&self, cdp: Cdp) -> Option<&IndexHealth> {
        self.indices.get(&cdp.index_name())
    }
}

/// The backend reports connectivity nested under `elasticsearch`; snapshots
/// re-serialized by this crate use the flat form. Both decode.
#[derive(Deserialize)]
#[serde(untagged)]
enum HealthWire {
    #[serde(rename_all = "camelCase")]
    Flat {
        elasticsearch_connected: bool,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        indices: BTreeMap<String, IndexHealth>,
    },
    Nested {
        elasticsearch: ElasticsearchWire,
        #[serde(default)]
        indices: BTreeMap<String, IndexHealth>,
    },
}

#[derive(Deserialize)]
struct ElasticsearchWire {
    connected: bool,
    #[serde(default)]
    timestamp: String,
}

impl From<HealthWire> for HealthStatus {
    fn from(wire: HealthWire) -> Self {
        match wire {
            HealthWire::Flat {
                elasticsearch_connected,
                timestamp,
                indices,
            } => Self {
                elasticsearch_connected,
                timestamp,
                indices,
            },
            HealthWire::Nested {
                elasticsearch,
                indices,
            } => Self {
                elasticsearch_connected: elasticsearch.connected,
                timestamp: elasticsearch.timestamp,
                indices,
            },
        }
    }
}

// ─── Request / response bodies ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub cdp: Cdp,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeSummary {
    pub cdp: Cdp,
    pub document_count: u64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cdp_parses_case_insensitively() {
        assert_eq!("mParticle".parse::<Cdp>().unwrap(), Cdp::Mparticle);
        assert_eq!(" zeotap ".parse::<Cdp>().unwrap(), Cdp::Zeotap);
        assert!("amplitude".parse::<Cdp>().is_err());
        assert_eq!(Cdp::Lytics.index_name(), "lytics_docs");
    }

    #[test]
    fn health_decodes_backend_shape() {
        let raw = json!({
            "elasticsearch": {"connected": true, "timestamp": "2024-01-01 10:00:00"},
            "indices": {
                "segment_docs": {"exists": true, "document_count": 42, "last_updated": "2024-01-01 10:00:00"},
                "zeotap_docs": {"exists": false, "document_count": 0}
            }
        });
        let health: HealthStatus = serde_json::from_value(raw).unwrap();
        assert!(health.elasticsearch_connected);
        assert_eq!(health.timestamp, "2024-01-01 10:00:00");
        assert_eq!(health.index_for(Cdp::Segment).unwrap().document_count, 42);
        assert!(!health.index_for(Cdp::Zeotap).unwrap().exists);
        assert!(health.index_for(Cdp::Lytics).is_none());
    }

    #[test]
    fn health_snapshot_reloads_from_flat_shape() {
        let raw = json!({
            "elasticsearchConnected": false,
            "timestamp": "t",
            "indices": {"lytics_docs": {"exists": true, "documentCount": 3}}
        });
        let health: HealthStatus = serde_json::from_value(raw).unwrap();
        let again: HealthStatus =
            serde_json::from_value(serde_json::to_value(&health).unwrap()).unwrap();
        assert_eq!(health, again);
        assert_eq!(again.index_for(Cdp::Lytics).unwrap().document_count, 3);
    }

    #[test]
    fn health_rejects_unrelated_payload() {
        let raw = json!({"error": "Health check failed", "message": "boom"});
        assert!(serde_json::from_value::<HealthStatus>(raw).is_err());
    }
}
