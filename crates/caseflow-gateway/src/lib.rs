//! # Caseflow 数据网关模块
//!
//! 定义病例、影像与诊断记录的数据网关契约，以及本地草稿存储抽象。
//! 提供内存实现（可由 JSON 夹具初始化）与文件草稿存储。

pub mod draft_store;
pub mod gateway;
pub mod memory;

// 重新导出主要类型
pub use draft_store::{draft_key, DraftStore, FileDraftStore, LocalDraftPayload, MemoryDraftStore};
pub use gateway::DataGateway;
pub use memory::{DoctorAccount, Fixture, MemoryGateway};
