//! Fixed set of topic categories

use serde::{Deserialize, Serialize};

/// Business area a topic belongs to
///
/// Serialized as its display label, which is also the text the model is
/// asked to echo back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TopicCategory {
    BusinessEfficiency,
    CustomerMarketing,
    DataAnalysis,
    Engineering,
    Creative,
    KnowledgeManagement,
}

impl TopicCategory {
    /// Every category, in prompt order
    pub const ALL: [TopicCategory; 6] = [
        Self::BusinessEfficiency,
        Self::CustomerMarketing,
        Self::DataAnalysis,
        Self::Engineering,
        Self::Creative,
        Self::KnowledgeManagement,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::BusinessEfficiency => "業務効率化（営業、経理、人事、総務など）",
            Self::CustomerMarketing => "顧客対応・マーケティング",
            Self::DataAnalysis => "データ分析・意思決定支援",
            Self::Engineering => "開発・エンジニアリング",
            Self::Creative => "クリエイティブ制作",
            Self::KnowledgeManagement => "組織運営・ナレッジマネジメント",
        }
    }

    /// Label without the parenthesized examples
    pub fn short_label(&self) -> &'static str {
        short(self.label())
    }

    /// ASCII key accepted on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Self::BusinessEfficiency => "business-efficiency",
            Self::CustomerMarketing => "customer-marketing",
            Self::DataAnalysis => "data-analysis",
            Self::Engineering => "engineering",
            Self::Creative => "creative",
            Self::KnowledgeManagement => "knowledge-management",
        }
    }
}

fn short(label: &str) -> &str {
    label.split(['（', '(']).next().unwrap_or(label).trim()
}

impl std::fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for TopicCategory {
    type Err = String;

    /// Accepts the full label, the label without its examples, or the key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let input_short = short(input);
        Self::ALL
            .into_iter()
            .find(|c| input == c.label() || input_short == c.short_label() || input.eq_ignore_ascii_case(c.key()))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl TryFrom<String> for TopicCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TopicCategory> for String {
    fn from(value: TopicCategory) -> Self {
        value.label().to_string()
    }
}
