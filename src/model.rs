use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Energy {
    Low,
    Medium,
    High,
}

impl Energy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ComboStatus {
    Training,
    Ready,
}

impl ComboStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Ready => "ready",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "training" => Some(Self::Training),
            "ready" => Some(Self::Ready),
            _ => None,
        }
    }
}

/// How a set of selected tags narrows a move pool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TagMatch {
    #[default]
    Any,
    All,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MoveQuery {
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub tag_match: TagMatch,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComboInput {
    pub name: String,
    pub description: Option<String>,
    pub energy: Energy,
    pub status: ComboStatus,
    pub move_ids: Vec<i64>,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComboChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub energy: Option<Energy>,
    pub status: Option<ComboStatus>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComboQuery {
    pub tags: Vec<String>,
    pub tag_match: TagMatch,
    pub energy: Option<Energy>,
    pub status: Option<ComboStatus>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleComboInput {
    pub description: String,
    pub energy: Energy,
    pub status: ComboStatus,
    pub moves: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BattleComboChanges {
    pub description: Option<String>,
    pub energy: Option<Energy>,
    pub status: Option<ComboStatus>,
    pub moves: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BattleQuery {
    pub energy: Option<Energy>,
    pub status: Option<ComboStatus>,
    pub used: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalInput {
    pub title: String,
    pub description: Option<String>,
    pub stages: Vec<StageInput>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageInput {
    pub name: String,
    pub target_count: i32,
    pub unit: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StageChanges {
    pub name: Option<String>,
    pub target_count: Option<i32>,
    pub current_count: Option<i32>,
    pub unit: Option<String>,
}
