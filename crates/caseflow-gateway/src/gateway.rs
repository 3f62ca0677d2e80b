//! 数据网关契约
//!
//! 核心只消费该接口，网络与存储传输由实现方负责，核心不做重试。

use async_trait::async_trait;
use caseflow_core::{CaseRecord, CaseStatus, DiagnosisRecord, Result, ScanRecord};

/// 病例数据网关接口
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// 获取医生名下的全部病例
    async fn fetch_cases_for_doctor(&self, email: &str) -> Result<Vec<CaseRecord>>;

    /// 获取影像检查
    async fn fetch_scan(&self, scan_id: &str) -> Result<ScanRecord>;

    /// 获取医生对某影像的诊断，不存在时返回 `None` 而非错误
    async fn fetch_diagnosis(&self, scan_id: &str, doctor_id: &str) -> Result<Option<DiagnosisRecord>>;

    /// 更新病例状态
    async fn update_case_status(&self, case_id: &str, status: CaseStatus) -> Result<()>;

    /// 写入诊断：`doctor_diagnosis_id` 为空时插入，否则更新。返回已存储的记录
    async fn upsert_diagnosis(&self, record: DiagnosisRecord) -> Result<DiagnosisRecord>;
}
