//! 病例仓库
//!
//! 每个会话加载一次医生的病例集，视图状态变化时只做派生计算不重新拉取

use crate::view::{view, ViewState, WorklistPage};
use caseflow_core::{CaseRecord, CaseStatus, CaseflowError, Result};
use caseflow_gateway::DataGateway;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// 病例仓库
pub struct CaseRepository {
    gateway: Arc<dyn DataGateway>,
    doctor_email: Option<String>,
    cases: Vec<CaseRecord>,
}

impl CaseRepository {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self {
            gateway,
            doctor_email: None,
            cases: Vec::new(),
        }
    }

    /// 加载医生病例集。同一邮箱已加载时直接返回缓存
    pub async fn load(&mut self, doctor_email: Option<&str>) -> Result<&[CaseRecord]> {
        let email = doctor_email
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(CaseflowError::AuthenticationMissing)?;

        if self.doctor_email.as_deref() == Some(email) {
            return Ok(&self.cases);
        }

        self.fetch(email).await?;
        Ok(&self.cases)
    }

    /// 强制重新拉取当前医生的病例
    pub async fn refresh(&mut self) -> Result<&[CaseRecord]> {
        let email = self
            .doctor_email
            .clone()
            .ok_or(CaseflowError::AuthenticationMissing)?;
        self.fetch(&email).await?;
        Ok(&self.cases)
    }

    async fn fetch(&mut self, email: &str) -> Result<()> {
        let cases = self
            .gateway
            .fetch_cases_for_doctor(email)
            .await
            .map_err(|e| {
                error!("Failed to load cases for {}: {}", email, e);
                e
            })?;

        info!("Loaded {} cases for {}", cases.len(), email);
        self.cases = cases;
        self.doctor_email = Some(email.to_string());
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.doctor_email.is_some()
    }

    /// 原始病例集，保持网关返回顺序
    pub fn all(&self) -> &[CaseRecord] {
        &self.cases
    }

    pub fn find(&self, case_id: &str) -> Result<&CaseRecord> {
        self.cases
            .iter()
            .find(|record| record.case_id == case_id)
            .ok_or_else(|| CaseflowError::NotFound(format!("Case {} not found", case_id)))
    }

    /// 计算当前视图
    pub fn view(&self, state: &ViewState, now: DateTime<Utc>) -> WorklistPage {
        view(&self.cases, state, now)
    }

    /// 同步已写入服务端的状态，避免重新拉取
    pub fn record_status(&mut self, case_id: &str, status: CaseStatus) -> Result<()> {
        let record = self
            .cases
            .iter_mut()
            .find(|record| record.case_id == case_id)
            .ok_or_else(|| CaseflowError::NotFound(format!("Case {} not found", case_id)))?;
        record.case_status = status;
        record.updated_at = Utc::now().max(record.created_at);
        Ok(())
    }
}
