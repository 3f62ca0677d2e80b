//! 只读派生标签

use crate::error::{CaseflowError, Result};
use crate::models::{CaseRecord, CaseStatus, PriorityRank, MAX_RATING, MIN_RATING};
use serde::Serialize;

/// AI 诊断键到病名的映射
const CONDITION_NAMES: &[(&str, &str)] = &[
    ("ms", "Multiple Sclerosis"),
    ("alzheimer", "Alzheimer's Disease"),
    ("cancer", "Brain Cancer"),
];

/// 翻译 AI 诊断键，大小写不敏感；未知键原样返回
pub fn translate_condition(key: &str) -> String {
    let lower = key.to_lowercase();
    CONDITION_NAMES
        .iter()
        .find(|(k, _)| *k == lower)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| key.to_string())
}

pub fn priority_label(rank: PriorityRank) -> &'static str {
    match rank {
        PriorityRank::Critical => "Critical",
        PriorityRank::High => "High",
        PriorityRank::Low => "Low",
        PriorityRank::NonUrgent => "Non-urgent",
    }
}

pub fn status_label(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Queued => "Queued",
        CaseStatus::Active => "Active",
        CaseStatus::Closed => "Closed",
    }
}

/// 校验 1-5 评分
pub fn validate_rating(rating: u8) -> Result<u8> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(CaseflowError::Validation(format!(
            "rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )))
    }
}

/// 病例的只读派生信息
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CaseInsight {
    pub confidence_score: Option<f64>,
    pub ai_diagnosis_label: Option<String>,
    pub priority: PriorityRank,
    pub priority_label: &'static str,
    pub status_label: &'static str,
}

impl CaseInsight {
    pub fn from_record(record: &CaseRecord) -> Self {
        let priority = record.effective_priority();
        Self {
            confidence_score: record.ai_confidence_score,
            ai_diagnosis_label: record.ai_diagnosis.as_deref().map(translate_condition),
            priority,
            priority_label: priority_label(priority),
            status_label: status_label(record.case_status),
        }
    }
}
