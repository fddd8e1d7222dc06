//! Request and response types for primary ranking inference

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Reason text used when a ranking unit omits one.
pub const DEFAULT_WHY: &str = "No description available";

/// Name used when an opaque response carries no recognizable name.
pub const DEFAULT_CANDIDATE_NAME: &str = "Unknown Policy";

// ============================================================================
// Caller input
// ============================================================================

/// Customer attributes the ranking and scoring units condition on.
///
/// Every field has a fallback so a sparse profile still produces a
/// complete worker payload; the fallbacks match what the production
/// profile store substitutes for missing columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default = "default_credit_score")]
    pub credit_score: i64,
    #[serde(default = "default_unknown")]
    pub geography: String,
    #[serde(default = "default_unknown")]
    pub gender: String,
    #[serde(default = "default_age")]
    pub age: u32,
    #[serde(default = "default_marital_status")]
    pub marital_status: String,
    #[serde(default = "default_salary")]
    pub salary: f64,
    #[serde(default = "default_tenure")]
    pub tenure: u32,
    #[serde(default = "default_balance")]
    pub balance: f64,
    #[serde(default = "default_num_products")]
    pub num_products: u32,
    #[serde(default = "default_true")]
    pub has_credit_card: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub exited: bool,
}

fn default_credit_score() -> i64 {
    650
}

fn default_unknown() -> String {
    "Unknown".to_string()
}

fn default_age() -> u32 {
    35
}

fn default_marital_status() -> String {
    "Single".to_string()
}

fn default_salary() -> f64 {
    50_000.0
}

fn default_tenure() -> u32 {
    2
}

fn default_balance() -> f64 {
    100_000.0
}

fn default_num_products() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            credit_score: default_credit_score(),
            geography: default_unknown(),
            gender: default_unknown(),
            age: default_age(),
            marital_status: default_marital_status(),
            salary: default_salary(),
            tenure: default_tenure(),
            balance: default_balance(),
            num_products: default_num_products(),
            has_credit_card: true,
            is_active: true,
            exited: false,
        }
    }
}

/// One recommendation request as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// Free-text description of what the customer is looking for
    pub description: String,
    /// Identifier of the customer the profile belongs to
    pub username: String,
    #[serde(default)]
    pub profile: UserProfile,
}

impl RecommendationRequest {
    pub fn new(
        description: impl Into<String>,
        username: impl Into<String>,
        profile: UserProfile,
    ) -> Self {
        Self {
            description: description.into(),
            username: username.into(),
            profile,
        }
    }

    /// Build the flat JSON document the computation units expect.
    ///
    /// Booleans travel as 0/1 integers on this boundary; the units feed
    /// them straight into a numeric feature vector.
    pub fn worker_payload(&self) -> Value {
        let p = &self.profile;
        json!({
            "description": self.description,
            "username": self.username,
            "credit_score": p.credit_score,
            "geography": p.geography,
            "gender": p.gender,
            "age": p.age,
            "marital_status": p.marital_status,
            "salary": p.salary,
            "tenure": p.tenure,
            "balance": p.balance,
            "num_products": p.num_products,
            "has_credit_card": if p.has_credit_card { 1 } else { 0 },
            "is_active": if p.is_active { 1 } else { 0 },
            "exited": if p.exited { 1 } else { 0 },
        })
    }
}

// ============================================================================
// Ranking output
// ============================================================================

/// One policy proposed by the ranking unit. Position in the list is the
/// rank; it is preserved all the way into the final response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub name: String,
    #[serde(default = "default_why")]
    pub why: String,
}

fn default_why() -> String {
    DEFAULT_WHY.to_string()
}

impl Candidate {
    pub fn new(name: impl Into<String>, why: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            why: why.into(),
        }
    }
}

/// The response shapes ranking units are known to produce.
///
/// Old units answer with a single object or something ad hoc; current
/// ones answer with a `policies` array. All of them funnel through
/// [`RankingResponse::into_ranking`] so the rest of the system only ever
/// sees one canonical form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RankingResponse {
    /// `{"policies": [...], "confidence"?: f, "method"?: s}`
    List {
        policies: Vec<Candidate>,
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        method: Option<String>,
    },
    /// A single `{"name": ..., "why"?: ...}` object
    Single {
        name: String,
        #[serde(default)]
        why: Option<String>,
    },
    /// Anything else; treated as one opaque candidate
    Opaque(Value),
}

impl RankingResponse {
    /// Collapse any accepted shape into the canonical ordered form.
    pub fn into_ranking(self) -> Ranking {
        match self {
            RankingResponse::List {
                policies,
                confidence,
                method,
            } => Ranking {
                candidates: policies,
                confidence,
                method,
            },
            RankingResponse::Single { name, why } => Ranking {
                candidates: vec![Candidate::new(name, why.unwrap_or_else(default_why))],
                confidence: None,
                method: None,
            },
            RankingResponse::Opaque(value) => {
                let name = value
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_CANDIDATE_NAME);
                let why = value
                    .get("why")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_WHY);
                Ranking {
                    candidates: vec![Candidate::new(name, why)],
                    confidence: None,
                    method: None,
                }
            }
        }
    }
}

/// Canonical ranking output: ordered candidates plus whatever metadata
/// the unit reported about its own prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub candidates: Vec<Candidate>,
    pub confidence: Option<f64>,
    pub method: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
