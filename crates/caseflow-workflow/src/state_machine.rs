//! 病例状态机
//!
//! 管理病例 Queued → Active → Closed 及重新打开的状态转换

use caseflow_core::{CaseStatus, CaseflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 病例状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaseEvent {
    Save,
    Close,
    Reopen,
}

/// 病例状态机
#[derive(Debug)]
pub struct CaseStateMachine {
    transitions: HashMap<(CaseStatus, CaseEvent), CaseStatus>,
}

impl CaseStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 保存总是把病例推进到处理中
        transitions.insert((CaseStatus::Queued, CaseEvent::Save), CaseStatus::Active);
        transitions.insert((CaseStatus::Active, CaseEvent::Save), CaseStatus::Active);
        // 关闭前必须先保存，因此只能从处理中关闭
        transitions.insert((CaseStatus::Active, CaseEvent::Close), CaseStatus::Closed);
        transitions.insert((CaseStatus::Closed, CaseEvent::Reopen), CaseStatus::Active);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: CaseStatus, event: CaseEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: CaseStatus, event: CaseEvent) -> Result<CaseStatus> {
        self.transitions
            .get(&(from, event))
            .copied()
            .ok_or_else(|| CaseflowError::InvalidStateTransition {
                from: from.to_string(),
                event: format!("{:?}", event),
            })
    }

    /// 获取状态的所有可能事件
    pub fn possible_events(&self, current: CaseStatus) -> Vec<CaseEvent> {
        let mut events: Vec<CaseEvent> = self
            .transitions
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, event)| *event)
            .collect();
        events.sort_by_key(|event| *event as u8);
        events
    }
}

impl Default for CaseStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
