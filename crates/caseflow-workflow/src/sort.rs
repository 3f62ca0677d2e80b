//! 排序引擎
//!
//! 按可选策略对病例排序，并为 AI 优先级模式保留一格历史用于撤销

use caseflow_core::CaseRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 排序策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortStrategy {
    Newest,
    Oldest,
    Status,
    Priority,
}

impl SortStrategy {
    /// 解析策略键，未知键回落到最新优先
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "newest" => SortStrategy::Newest,
            "oldest" => SortStrategy::Oldest,
            "status" => SortStrategy::Status,
            "priority" => SortStrategy::Priority,
            _ => SortStrategy::Newest,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            SortStrategy::Newest => "newest",
            SortStrategy::Oldest => "oldest",
            SortStrategy::Status => "status",
            SortStrategy::Priority => "priority",
        }
    }
}

impl Default for SortStrategy {
    fn default() -> Self {
        SortStrategy::Newest
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 稳定排序，相等元素保持输入顺序
pub fn sort_records(records: &[CaseRecord], strategy: SortStrategy) -> Vec<CaseRecord> {
    let mut sorted = records.to_vec();
    match strategy {
        SortStrategy::Newest => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortStrategy::Oldest => sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortStrategy::Status => {
            sorted.sort_by(|a, b| a.case_status.code().cmp(b.case_status.code()))
        }
        SortStrategy::Priority => sorted.sort_by_key(|record| record.effective_priority()),
    }
    sorted
}

/// 排序状态：当前策略、AI 模式开关和一格历史
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortEngine {
    strategy: SortStrategy,
    ai_active: bool,
    previous: Option<SortStrategy>,
}

impl SortEngine {
    pub fn new(strategy: SortStrategy) -> Self {
        Self {
            strategy,
            ai_active: false,
            previous: None,
        }
    }

    pub fn strategy(&self) -> SortStrategy {
        self.strategy
    }

    pub fn is_ai_active(&self) -> bool {
        self.ai_active
    }

    /// 已保存的上一策略
    pub fn remembered(&self) -> Option<SortStrategy> {
        self.previous
    }

    /// 显式选择策略。AI 模式下先退出 AI 模式，不恢复历史
    pub fn select(&mut self, strategy: SortStrategy) {
        if self.ai_active {
            self.ai_active = false;
        }
        self.strategy = strategy;
    }

    /// 切换 AI 优先级模式，返回切换后的策略
    pub fn toggle_ai(&mut self) -> SortStrategy {
        if self.ai_active {
            self.strategy = self.previous.take().unwrap_or_default();
            self.ai_active = false;
        } else {
            self.previous = Some(self.strategy);
            self.strategy = SortStrategy::Priority;
            self.ai_active = true;
        }
        tracing::debug!(
            "AI priority sort {}, strategy now {}",
            if self.ai_active { "enabled" } else { "disabled" },
            self.strategy
        );
        self.strategy
    }

    pub fn sort(&self, records: &[CaseRecord]) -> Vec<CaseRecord> {
        sort_records(records, self.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{case_created_at, case_with_priority, case_with_status};
    use caseflow_core::{CaseStatus, PriorityRank};
    use chrono::{Duration, Utc};

    fn ids(records: &[CaseRecord]) -> Vec<&str> {
        records.iter().map(|r| r.case_id.as_str()).collect()
    }

    #[test]
    fn test_newest_and_oldest() {
        let now = Utc::now();
        let records = vec![
            case_created_at("mid", now - Duration::days(2)),
            case_created_at("new", now),
            case_created_at("old", now - Duration::days(5)),
        ];

        assert_eq!(ids(&sort_records(&records, SortStrategy::Newest)), ["new", "mid", "old"]);
        assert_eq!(ids(&sort_records(&records, SortStrategy::Oldest)), ["old", "mid", "new"]);
    }

    #[test]
    fn test_status_ascending_by_code() {
        let records = vec![
            case_with_status("closed", CaseStatus::Closed),
            case_with_status("queued", CaseStatus::Queued),
            case_with_status("active", CaseStatus::Active),
        ];
        assert_eq!(
            ids(&sort_records(&records, SortStrategy::Status)),
            ["queued", "active", "closed"]
        );
    }

    #[test]
    fn test_priority_absent_rank_sorts_as_tier_four() {
        let records = vec![
            case_with_priority("none", None),
            case_with_priority("four", Some(PriorityRank::NonUrgent)),
            case_with_priority("one", Some(PriorityRank::Critical)),
            case_with_priority("three", Some(PriorityRank::Low)),
        ];

        let sorted = sort_records(&records, SortStrategy::Priority);
        assert_eq!(ids(&sorted), ["one", "three", "none", "four"]);
        assert!(sorted
            .windows(2)
            .all(|pair| pair[0].effective_priority() <= pair[1].effective_priority()));
    }

    #[test]
    fn test_unknown_strategy_key() {
        assert_eq!(SortStrategy::from_key("alphabetical"), SortStrategy::Newest);
        assert_eq!(SortStrategy::from_key("Priority"), SortStrategy::Priority);
    }

    #[test]
    fn test_toggle_on_then_off_restores_previous() {
        let mut engine = SortEngine::new(SortStrategy::Status);

        assert_eq!(engine.toggle_ai(), SortStrategy::Priority);
        assert!(engine.is_ai_active());

        assert_eq!(engine.toggle_ai(), SortStrategy::Status);
        assert!(!engine.is_ai_active());
        assert_eq!(engine.remembered(), None);
    }

    #[test]
    fn test_explicit_selection_clears_ai_without_restoring() {
        let mut engine = SortEngine::new(SortStrategy::Status);
        engine.toggle_ai();

        engine.select(SortStrategy::Oldest);
        assert!(!engine.is_ai_active());
        assert_eq!(engine.strategy(), SortStrategy::Oldest);

        engine.toggle_ai();
        assert_eq!(engine.remembered(), Some(SortStrategy::Oldest));
        assert_eq!(engine.toggle_ai(), SortStrategy::Oldest);
    }

    #[test]
    fn test_toggle_off_without_history_falls_back_to_newest() {
        let mut engine = SortEngine {
            strategy: SortStrategy::Priority,
            ai_active: true,
            previous: None,
        };
        assert_eq!(engine.toggle_ai(), SortStrategy::Newest);
    }
}
