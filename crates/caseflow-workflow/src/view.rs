//! 工作列表视图
//!
//! 视图状态（时间窗口、排序、范围、搜索、页码）与纯函数管线
//! `filter -> scope/search -> sort -> page`，每次状态变化同步重算

use crate::pager::{self, DEFAULT_PAGE_WINDOW};
use crate::sort::{SortEngine, SortStrategy};
use crate::timeframe::{filter_by_timeframe, Timeframe};
use caseflow_core::{CaseRecord, CaseStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 默认每页病例数
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// 病例范围：工作列表显示未关闭病例，历史显示已关闭病例
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseScope {
    #[default]
    Open,
    Closed,
    All,
}

impl CaseScope {
    pub fn includes(&self, status: CaseStatus) -> bool {
        match self {
            CaseScope::Open => status.is_open(),
            CaseScope::Closed => status == CaseStatus::Closed,
            CaseScope::All => true,
        }
    }
}

/// 大小写不敏感的子串匹配：患者姓名、病例号，以及初步诊断（历史范围下为最终诊断）
pub fn matches_search(record: &CaseRecord, query: &str, scope: CaseScope) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    let diagnosis = match scope {
        CaseScope::Closed => record.final_diagnosis.as_deref(),
        _ => record.initial_diagnosis.as_deref(),
    };

    record.patient_name.to_lowercase().contains(&needle)
        || record.case_id.to_lowercase().contains(&needle)
        || diagnosis.is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// 视图状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewState {
    timeframe: Timeframe,
    previous_timeframe: Option<Timeframe>,
    sort: SortEngine,
    current_page: usize,
    search_query: String,
    scope: CaseScope,
    page_size: usize,
    page_window: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, Timeframe::Week, SortStrategy::Newest)
    }
}

impl ViewState {
    pub fn new(page_size: usize, timeframe: Timeframe, strategy: SortStrategy) -> Self {
        Self {
            timeframe,
            previous_timeframe: None,
            sort: SortEngine::new(strategy),
            current_page: 1,
            search_query: String::new(),
            scope: CaseScope::Open,
            page_size,
            page_window: DEFAULT_PAGE_WINDOW,
        }
    }

    pub fn with_page_window(mut self, window: usize) -> Self {
        self.page_window = window;
        self
    }

    pub fn with_scope(mut self, scope: CaseScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn sort(&self) -> &SortEngine {
        &self.sort
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn scope(&self) -> CaseScope {
        self.scope
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// 切换时间窗口，记住上一个窗口
    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.previous_timeframe = Some(self.timeframe);
        self.timeframe = timeframe;
        self.current_page = 1;
    }

    /// 恢复上一个时间窗口；没有历史时保持不变
    pub fn undo_timeframe(&mut self) -> Timeframe {
        if let Some(previous) = self.previous_timeframe.take() {
            self.timeframe = previous;
            self.current_page = 1;
        }
        self.timeframe
    }

    pub fn select_sort(&mut self, strategy: SortStrategy) {
        self.sort.select(strategy);
        self.current_page = 1;
    }

    pub fn toggle_ai_sort(&mut self) -> SortStrategy {
        self.current_page = 1;
        self.sort.toggle_ai()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.current_page = 1;
    }

    pub fn set_scope(&mut self, scope: CaseScope) {
        self.scope = scope;
        self.current_page = 1;
    }

    /// 跳转页码，不做钳制
    pub fn go_to_page(&mut self, page: usize) {
        self.current_page = page;
    }
}

/// 视图结果：一页病例及分页信息
#[derive(Debug, Clone, Serialize)]
pub struct WorklistPage {
    pub records: Vec<CaseRecord>,
    pub total_records: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_window: Vec<usize>,
    pub timeframe: Timeframe,
    pub strategy: SortStrategy,
    pub ai_sort_active: bool,
}

/// 由原始病例集与视图状态计算当前页
pub fn view(raw: &[CaseRecord], state: &ViewState, now: DateTime<Utc>) -> WorklistPage {
    let mut narrowed = filter_by_timeframe(raw, state.timeframe, now);
    narrowed.retain(|record| {
        state.scope.includes(record.case_status)
            && matches_search(record, &state.search_query, state.scope)
    });

    let sorted = state.sort.sort(&narrowed);
    let total_pages = pager::total_pages(sorted.len(), state.page_size);
    let records = pager::page(&sorted, state.page_size, state.current_page);

    tracing::debug!(
        "View recomputed: {} raw, {} matched, page {}/{} ({})",
        raw.len(),
        sorted.len(),
        state.current_page,
        total_pages,
        state.sort.strategy()
    );

    WorklistPage {
        total_records: sorted.len(),
        total_pages,
        current_page: state.current_page,
        page_window: pager::page_window(total_pages, state.current_page, state.page_window),
        timeframe: state.timeframe,
        strategy: state.sort.strategy(),
        ai_sort_active: state.sort.is_ai_active(),
        records,
    }
}
