//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 评分下限
pub const MIN_RATING: u8 = 1;
/// 评分上限
pub const MAX_RATING: u8 = 5;
/// 未评分时的默认值
pub const DEFAULT_RATING: u8 = 3;

/// 病例状态，线上以 "1"/"2"/"3" 编码
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaseStatus {
    #[serde(rename = "1")]
    Queued, // 排队中
    #[serde(rename = "2")]
    Active, // 处理中
    #[serde(rename = "3")]
    Closed, // 已关闭
}

impl CaseStatus {
    /// 线上状态编码
    pub fn code(&self) -> &'static str {
        match self {
            CaseStatus::Queued => "1",
            CaseStatus::Active => "2",
            CaseStatus::Closed => "3",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(CaseStatus::Queued),
            "2" => Some(CaseStatus::Active),
            "3" => Some(CaseStatus::Closed),
            _ => None,
        }
    }

    /// 是否仍在工作列表中（未关闭）
    pub fn is_open(&self) -> bool {
        !matches!(self, CaseStatus::Closed)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStatus::Queued => write!(f, "Queued"),
            CaseStatus::Active => write!(f, "Active"),
            CaseStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// AI 优先级档位，1 为最紧急
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum PriorityRank {
    Critical = 1,
    High = 2,
    Low = 3,
    NonUrgent = 4,
}

impl PriorityRank {
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl Default for PriorityRank {
    fn default() -> Self {
        PriorityRank::NonUrgent
    }
}

impl TryFrom<u8> for PriorityRank {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(PriorityRank::Critical),
            2 => Ok(PriorityRank::High),
            3 => Ok(PriorityRank::Low),
            4 => Ok(PriorityRank::NonUrgent),
            other => Err(format!("priority rank must be 1-4, got {}", other)),
        }
    }
}

impl From<PriorityRank> for u8 {
    fn from(rank: PriorityRank) -> Self {
        rank.rank()
    }
}

/// 病例记录：合并了患者与 AI 诊断字段的展示行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseRecord {
    pub case_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub gender: Option<String>,
    pub national_id: String,
    pub patient_phone_number: String,
    #[serde(default)]
    pub medical_history: Option<String>,
    pub case_status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub initial_diagnosis: Option<String>,
    #[serde(default)]
    pub final_diagnosis: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub diagnosis_confirmed_by: Option<String>,
    #[serde(default)]
    pub scan_id: Option<String>,
    #[serde(default)]
    pub ai_diagnosis_id: Option<String>,
    #[serde(default)]
    pub ai_diagnosis: Option<String>,
    /// 置信度，0-100
    #[serde(default)]
    pub ai_confidence_score: Option<f64>,
    #[serde(default)]
    pub ai_priority_rank: Option<PriorityRank>,
    #[serde(default)]
    pub llm_generated_patient_history: Option<String>,
}

impl CaseRecord {
    /// 有效优先级，缺失按 4 档处理
    pub fn effective_priority(&self) -> PriorityRank {
        self.ai_priority_rank.unwrap_or_default()
    }
}

/// 影像检查记录，打开病例时按需加载
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanRecord {
    pub scan_id: String,
    pub image_storage_path: String,
    pub scan_type: String,
    pub scan_date: DateTime<Utc>,
    #[serde(default)]
    pub clinical_notes: Option<String>,
}

/// 服务端医生诊断记录（doctor_diagnoses）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisRecord {
    /// 未持久化时为空
    #[serde(default)]
    pub doctor_diagnosis_id: Option<String>,
    pub scan_id: String,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub ai_diagnosis_id: Option<String>,
    #[serde(default)]
    pub ai_image_analysis_rating: Option<u8>,
    #[serde(default)]
    pub llm_narrative_rating: Option<u8>,
    #[serde(default)]
    pub final_doctor_diagnosis: Option<String>,
    #[serde(default)]
    pub feedback_comments: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiagnosisRecord {
    /// 用草稿内容覆盖可编辑字段
    pub fn apply_draft(&mut self, draft: &DiagnosisDraft, now: DateTime<Utc>) {
        self.ai_image_analysis_rating = Some(draft.ai_image_rating);
        self.llm_narrative_rating = Some(draft.llm_narrative_rating);
        self.final_doctor_diagnosis = Some(draft.final_diagnosis.clone());
        self.feedback_comments = Some(draft.feedback_comments.clone());
        self.updated_at = now;
    }
}

/// 医生可编辑的诊断草稿
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosisDraft {
    pub final_diagnosis: String,
    pub feedback_comments: String,
    pub ai_image_rating: u8,
    pub llm_narrative_rating: u8,
}

impl Default for DiagnosisDraft {
    fn default() -> Self {
        Self {
            final_diagnosis: String::new(),
            feedback_comments: String::new(),
            ai_image_rating: DEFAULT_RATING,
            llm_narrative_rating: DEFAULT_RATING,
        }
    }
}

impl DiagnosisDraft {
    /// 从服务端记录填充四个可编辑字段，空值回落到默认值
    pub fn from_server(record: &DiagnosisRecord) -> Self {
        Self {
            final_diagnosis: record.final_doctor_diagnosis.clone().unwrap_or_default(),
            feedback_comments: record.feedback_comments.clone().unwrap_or_default(),
            ai_image_rating: record.ai_image_analysis_rating.unwrap_or(DEFAULT_RATING),
            llm_narrative_rating: record.llm_narrative_rating.unwrap_or(DEFAULT_RATING),
        }
    }

    pub fn has_final_diagnosis(&self) -> bool {
        !self.final_diagnosis.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_codes() {
        let json = serde_json::to_string(&CaseStatus::Active).unwrap();
        assert_eq!(json, "\"2\"");

        let status: CaseStatus = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(status, CaseStatus::Closed);
        assert!(serde_json::from_str::<CaseStatus>("\"9\"").is_err());
    }

    #[test]
    fn test_priority_rank_bounds() {
        let rank: PriorityRank = serde_json::from_str("1").unwrap();
        assert_eq!(rank, PriorityRank::Critical);
        assert!(serde_json::from_str::<PriorityRank>("5").is_err());
        assert_eq!(PriorityRank::default().rank(), 4);
    }

    #[test]
    fn test_draft_from_server_defaults() {
        let now = Utc::now();
        let record = DiagnosisRecord {
            doctor_diagnosis_id: Some("d-1".to_string()),
            scan_id: "s-1".to_string(),
            doctor_id: None,
            ai_diagnosis_id: None,
            ai_image_analysis_rating: None,
            llm_narrative_rating: Some(5),
            final_doctor_diagnosis: Some("MS".to_string()),
            feedback_comments: None,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };

        let draft = DiagnosisDraft::from_server(&record);
        assert_eq!(draft.final_diagnosis, "MS");
        assert_eq!(draft.feedback_comments, "");
        assert_eq!(draft.ai_image_rating, DEFAULT_RATING);
        assert_eq!(draft.llm_narrative_rating, 5);
    }

    #[test]
    fn test_whitespace_diagnosis_is_empty() {
        let draft = DiagnosisDraft {
            final_diagnosis: "   ".to_string(),
            ..Default::default()
        };
        assert!(!draft.has_final_diagnosis());
    }
}
