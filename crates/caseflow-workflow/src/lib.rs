//! # Caseflow 工作流模块
//!
//! 医生工作列表的派生视图（时间窗口、排序、搜索、分页）、
//! 病例仓库、病例状态机以及诊断草稿的打开/编辑/保存/关闭流程。

pub mod draft;
pub mod pager;
pub mod repository;
pub mod sort;
pub mod state_machine;
pub mod timeframe;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

// 重新导出主要类型
pub use draft::{CaseDraftWorkflow, CaseSnapshot, CloseConfirmation, DraftSource, Fetched, SaveReceipt};
pub use pager::{page, page_window, total_pages, DEFAULT_PAGE_WINDOW};
pub use repository::CaseRepository;
pub use sort::{sort_records, SortEngine, SortStrategy};
pub use state_machine::{CaseEvent, CaseStateMachine};
pub use timeframe::{filter_by_timeframe, Timeframe};
pub use view::{matches_search, view, CaseScope, ViewState, WorklistPage, DEFAULT_PAGE_SIZE};
