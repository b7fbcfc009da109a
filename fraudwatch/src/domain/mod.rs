pub mod transactions;

pub mod prelude {
    pub use super::{
        chat::{ChatMessage, ChatRole, QuickAction},
        metrics::{FraudMetrics, RiskBucket, TrendPoint},
        session::{Role, User},
        transactions::{Flag, RiskTier, Status, Transaction},
    };
}

/// Deserializes `null` (or a missing field, together with `#[serde(default)]`)
/// into the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    use serde::Deserialize;
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub mod metrics {
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    /// Aggregated dashboard figures as computed by the backend.
    ///
    /// Only the first five fields are guaranteed; the rest are extras the
    /// live backend sends and default to zero/empty when absent.
    ///
    #[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct FraudMetrics {
        pub total_transactions: u64,
        pub flagged_transactions: u64,
        pub overall_risk_score: f64,
        #[serde(default)]
        pub fraud_trend: Vec<TrendPoint>,
        #[serde(default)]
        pub risk_distribution: Vec<RiskBucket>,

        #[serde(default)]
        pub average_amount: f64,
        #[serde(default)]
        pub fraud_percent: f64,
        #[serde(default)]
        pub safe_percent: f64,
        #[serde(default)]
        pub most_active_user: Option<String>,
        #[serde(default)]
        pub fraud_type_counts: HashMap<String, u64>,
        #[serde(default)]
        pub top_users: Vec<serde_json::Value>,
        #[serde(default)]
        pub avg_amount_fraud: f64,
        #[serde(default)]
        pub avg_amount_safe: f64,
    }

    #[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct TrendPoint {
        pub date: String,
        #[serde(default)]
        pub fraud_count: u64,
        #[serde(default)]
        pub safe_count: u64,
    }

    #[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
    pub struct RiskBucket {
        pub name: String,
        pub value: f64,
    }

    impl FraudMetrics {
        /// Share of flagged transactions, in percent.
        pub fn flagged_ratio(&self) -> f64 {
            if self.total_transactions == 0 {
                return 0.0;
            }
            self.flagged_transactions as f64 / self.total_transactions as f64 * 100.0
        }
    }
}

pub mod session {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[serde(rename_all = "snake_case")]
    pub enum Role {
        #[default]
        Analyst,
        Admin,
    }

    /// The analyst currently signed in to the console.
    #[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
    pub struct User {
        pub id: String,
        pub username: String,
        pub role: Role,
        pub token: String,
    }
}

pub mod chat {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum ChatRole {
        User,
        Model,
    }

    /// One entry of the assistant conversation.
    ///
    /// `is_streaming` stays true while model fragments are still arriving.
    ///
    #[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
    pub struct ChatMessage {
        pub id: String,
        pub role: ChatRole,
        pub text: String,
        #[serde(default)]
        pub is_streaming: bool,
    }

    impl ChatMessage {
        pub fn user(text: impl Into<String>) -> Self {
            Self {
                id: uuid::Uuid::new_v4().to_string(),
                role: ChatRole::User,
                text: text.into(),
                is_streaming: false,
            }
        }

        pub fn model_placeholder() -> Self {
            Self {
                id: uuid::Uuid::new_v4().to_string(),
                role: ChatRole::Model,
                text: String::new(),
                is_streaming: true,
            }
        }
    }

    /// Canned prompts offered next to the chat input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum QuickAction {
        Freeze,
        Transactions,
        Contact,
        SecureAccount,
    }

    impl QuickAction {
        pub const ALL: [QuickAction; 4] = [
            QuickAction::Freeze,
            QuickAction::Transactions,
            QuickAction::Contact,
            QuickAction::SecureAccount,
        ];

        pub fn label(&self) -> &'static str {
            match self {
                Self::Freeze => "Freeze Card",
                Self::Transactions => "Check Transactions",
                Self::Contact => "Contact Bank",
                Self::SecureAccount => "Secure Account",
            }
        }

        pub fn prompt(&self) -> &'static str {
            match self {
                Self::Freeze => "I want to freeze my card.",
                Self::Transactions => "I want to check my transactions.",
                Self::Contact => "I want to contact the bank.",
                Self::SecureAccount => "How do I change my password?",
            }
        }
    }

    impl std::str::FromStr for QuickAction {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "freeze" => Ok(Self::Freeze),
                "transactions" => Ok(Self::Transactions),
                "contact" => Ok(Self::Contact),
                "passwords" | "secure" => Ok(Self::SecureAccount),
                _ => Err(()),
            }
        }
    }
}
