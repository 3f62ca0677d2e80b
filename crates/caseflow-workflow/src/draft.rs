//! 病例诊断草稿工作流
//!
//! 负责单个打开病例的可编辑诊断：
//! - 打开时以服务端诊断为准，否则回落到本地草稿或默认值
//! - 每次编辑立即写入本地草稿存储，仅用于刷新后恢复
//! - 保存按“状态写入 → 诊断写入”顺序执行，部分失败单独报告
//! - 关闭需先保存并经过显式确认，重新打开不再校验诊断内容
//!
//! 打开其他病例或放弃当前病例后，仍在途中的网关结果会被丢弃。

use crate::repository::CaseRepository;
use crate::state_machine::{CaseEvent, CaseStateMachine};
use caseflow_core::utils::{validate_rating, CaseInsight};
use caseflow_core::{
    CaseRecord, CaseStatus, CaseflowError, DiagnosisDraft, DiagnosisRecord, Result, ScanRecord,
    DEFAULT_RATING,
};
use caseflow_gateway::{DataGateway, DraftStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// 草稿来源
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DraftSource {
    /// 服务端已确认的诊断
    Server,
    /// 本地未同步草稿
    Local,
    /// 默认空白草稿
    Fresh,
}

/// 异步结果：仍对应当前病例，或已过期
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Current(T),
    Stale,
}

impl<T> Fetched<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Fetched::Stale)
    }

    pub fn current(self) -> Option<T> {
        match self {
            Fetched::Current(value) => Some(value),
            Fetched::Stale => None,
        }
    }
}

/// 打开病例的只读快照
#[derive(Debug, Clone, Serialize)]
pub struct CaseSnapshot {
    pub case: CaseRecord,
    pub insight: CaseInsight,
    pub draft: DiagnosisDraft,
    pub source: DraftSource,
    pub server_diagnosis: Option<DiagnosisRecord>,
    pub scan: Option<ScanRecord>,
}

/// 保存成功回执
#[derive(Debug, Clone, Serialize)]
pub struct SaveReceipt {
    pub case_id: String,
    pub status: CaseStatus,
    pub diagnosis: DiagnosisRecord,
}

/// 关闭确认凭据，只能由 [`CaseDraftWorkflow::request_close`] 签发
#[derive(Debug)]
pub struct CloseConfirmation {
    case_id: String,
}

impl CloseConfirmation {
    pub fn case_id(&self) -> &str {
        &self.case_id
    }
}

#[derive(Debug)]
struct OpenCase {
    case: CaseRecord,
    server_diagnosis: Option<DiagnosisRecord>,
    draft: DiagnosisDraft,
    source: DraftSource,
    scan: Option<ScanRecord>,
}

impl OpenCase {
    fn snapshot(&self) -> CaseSnapshot {
        CaseSnapshot {
            case: self.case.clone(),
            insight: CaseInsight::from_record(&self.case),
            draft: self.draft.clone(),
            source: self.source,
            server_diagnosis: self.server_diagnosis.clone(),
            scan: self.scan.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct WorkflowState {
    /// 最近一次请求打开的病例，用于丢弃过期响应
    active_case_id: Option<String>,
    open: Option<OpenCase>,
    pending_close: Option<String>,
}

impl WorkflowState {
    fn open_for(&mut self, case_id: &str) -> Option<&mut OpenCase> {
        self.open
            .as_mut()
            .filter(|open| open.case.case_id == case_id)
    }
}

/// 病例诊断草稿工作流，可克隆并在任务间共享
#[derive(Clone)]
pub struct CaseDraftWorkflow {
    gateway: Arc<dyn DataGateway>,
    store: Arc<dyn DraftStore>,
    machine: Arc<CaseStateMachine>,
    state: Arc<RwLock<WorkflowState>>,
}

impl CaseDraftWorkflow {
    pub fn new(gateway: Arc<dyn DataGateway>, store: Arc<dyn DraftStore>) -> Self {
        Self {
            gateway,
            store,
            machine: Arc::new(CaseStateMachine::new()),
            state: Arc::new(RwLock::new(WorkflowState::default())),
        }
    }

    /// 从仓库定位病例并打开
    pub async fn open_from(
        &self,
        repository: &CaseRepository,
        case_id: &str,
    ) -> Result<Fetched<CaseSnapshot>> {
        let case = repository.find(case_id)?.clone();
        self.open_case(case).await
    }

    /// 打开病例并协调草稿
    pub async fn open_case(&self, case: CaseRecord) -> Result<Fetched<CaseSnapshot>> {
        let case_id = case.case_id.clone();
        {
            let mut state = self.state.write().await;
            state.active_case_id = Some(case_id.clone());
            state.open = None;
            state.pending_close = None;
        }

        let server = match (case.scan_id.as_deref(), case.diagnosis_confirmed_by.as_deref()) {
            (Some(scan_id), Some(doctor_id)) => self.gateway.fetch_diagnosis(scan_id, doctor_id).await,
            _ => Ok(None),
        };

        if !self.is_active(&case_id).await {
            warn!("Discarding diagnosis response for abandoned case {}", case_id);
            return Ok(Fetched::Stale);
        }

        let server = server.map_err(|e| {
            error!("Failed to fetch diagnosis for case {}: {}", case_id, e);
            e
        })?;

        let (draft, source) = match &server {
            Some(record) => {
                self.discard_local(&case_id).await;
                (DiagnosisDraft::from_server(record), DraftSource::Server)
            }
            None => match self.store.read(&case_id).await {
                Ok(Some(local)) => (sanitize_ratings(local), DraftSource::Local),
                Ok(None) => (DiagnosisDraft::default(), DraftSource::Fresh),
                Err(e) => {
                    warn!("Ignoring unreadable local draft for case {}: {}", case_id, e);
                    (DiagnosisDraft::default(), DraftSource::Fresh)
                }
            },
        };

        let mut state = self.state.write().await;
        if state.active_case_id.as_deref() != Some(case_id.as_str()) {
            warn!("Discarding reconciled draft for abandoned case {}", case_id);
            return Ok(Fetched::Stale);
        }

        info!("Opened case {} with {:?} draft", case_id, source);
        let open = OpenCase {
            case,
            server_diagnosis: server,
            draft,
            source,
            scan: None,
        };
        let snapshot = open.snapshot();
        state.open = Some(open);
        Ok(Fetched::Current(snapshot))
    }

    /// 加载当前病例的影像，没有 scan_id 时返回 `None`
    pub async fn load_scan(&self) -> Result<Fetched<Option<ScanRecord>>> {
        let (case_id, scan_id) = {
            let state = self.state.read().await;
            let open = state.open.as_ref().ok_or_else(no_open_case)?;
            (open.case.case_id.clone(), open.case.scan_id.clone())
        };

        let Some(scan_id) = scan_id else {
            return Ok(Fetched::Current(None));
        };

        let result = self.gateway.fetch_scan(&scan_id).await;

        let mut state = self.state.write().await;
        let Some(open) = state.open_for(&case_id) else {
            warn!("Discarding scan {} for abandoned case {}", scan_id, case_id);
            return Ok(Fetched::Stale);
        };

        let scan = result.map_err(|e| {
            error!("Failed to fetch scan {}: {}", scan_id, e);
            e
        })?;
        open.scan = Some(scan.clone());
        Ok(Fetched::Current(Some(scan)))
    }

    /// 放弃当前病例，在途结果将被丢弃
    pub async fn abandon(&self) {
        let mut state = self.state.write().await;
        if let Some(case_id) = state.active_case_id.take() {
            debug!("Abandoned case {}", case_id);
        }
        state.open = None;
        state.pending_close = None;
    }

    /// 当前打开病例的快照
    pub async fn snapshot(&self) -> Option<CaseSnapshot> {
        self.state.read().await.open.as_ref().map(OpenCase::snapshot)
    }

    pub async fn set_final_diagnosis(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.edit(|draft| draft.final_diagnosis = text).await
    }

    pub async fn set_feedback_comments(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.edit(|draft| draft.feedback_comments = text).await
    }

    pub async fn set_image_rating(&self, rating: u8) -> Result<()> {
        let rating = validate_rating(rating)?;
        self.edit(|draft| draft.ai_image_rating = rating).await
    }

    pub async fn set_narrative_rating(&self, rating: u8) -> Result<()> {
        let rating = validate_rating(rating)?;
        self.edit(|draft| draft.llm_narrative_rating = rating).await
    }

    /// 修改草稿并立即写入本地存储
    async fn edit<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DiagnosisDraft),
    {
        let (case_id, draft) = {
            let mut state = self.state.write().await;
            let open = state.open.as_mut().ok_or_else(no_open_case)?;
            apply(&mut open.draft);
            (open.case.case_id.clone(), open.draft.clone())
        };

        self.store.write(&case_id, &draft).await
    }

    /// 保存：先把状态写为处理中，再写入诊断
    ///
    /// 状态写入失败时返回网关错误；状态已写入但诊断写入失败时返回
    /// [`CaseflowError::PartialSave`]，病例保持处理中且诊断未持久化。
    pub async fn save(&self) -> Result<SaveReceipt> {
        let (case, draft, existing) = {
            let state = self.state.read().await;
            let open = state.open.as_ref().ok_or_else(no_open_case)?;
            (open.case.clone(), open.draft.clone(), open.server_diagnosis.clone())
        };

        let scan_id = validate_for_save(&case, &draft)?;
        let next = self.machine.transition(case.case_status, CaseEvent::Save)?;

        self.write_status(&case.case_id, next).await?;

        let now = Utc::now();
        let record = match existing {
            Some(mut record) => {
                record.apply_draft(&draft, now);
                record.updated_by = case.diagnosis_confirmed_by.clone();
                record
            }
            None => DiagnosisRecord {
                doctor_diagnosis_id: None,
                scan_id,
                doctor_id: case.diagnosis_confirmed_by.clone(),
                ai_diagnosis_id: case.ai_diagnosis_id.clone(),
                ai_image_analysis_rating: Some(draft.ai_image_rating),
                llm_narrative_rating: Some(draft.llm_narrative_rating),
                final_doctor_diagnosis: Some(draft.final_diagnosis.clone()),
                feedback_comments: Some(draft.feedback_comments.clone()),
                created_by: case.diagnosis_confirmed_by.clone(),
                updated_by: case.diagnosis_confirmed_by.clone(),
                created_at: now,
                updated_at: now,
            },
        };

        let stored = match self.gateway.upsert_diagnosis(record).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    "Case {} promoted to {} but diagnosis was not saved: {}",
                    case.case_id, next, e
                );
                return Err(CaseflowError::PartialSave {
                    case_id: case.case_id,
                    reason: e.to_string(),
                });
            }
        };

        let mut unchanged_since_save = true;
        {
            let mut state = self.state.write().await;
            if let Some(open) = state.open_for(&case.case_id) {
                open.server_diagnosis = Some(stored.clone());
                open.source = DraftSource::Server;
                unchanged_since_save = open.draft == draft;
            }
        }
        if unchanged_since_save {
            self.discard_local(&case.case_id).await;
        }

        info!("Saved diagnosis for case {}", case.case_id);
        Ok(SaveReceipt {
            case_id: case.case_id,
            status: next,
            diagnosis: stored,
        })
    }

    /// 请求关闭：本地校验通过后签发确认凭据，不访问网关
    pub async fn request_close(&self) -> Result<CloseConfirmation> {
        let mut state = self.state.write().await;
        let open = state.open.as_ref().ok_or_else(no_open_case)?;

        validate_for_save(&open.case, &open.draft)?;
        let saved = self.machine.transition(open.case.case_status, CaseEvent::Save)?;
        self.machine.transition(saved, CaseEvent::Close)?;

        let case_id = open.case.case_id.clone();
        state.pending_close = Some(case_id.clone());
        Ok(CloseConfirmation { case_id })
    }

    /// 撤回关闭请求
    pub async fn cancel_close(&self) {
        self.state.write().await.pending_close = None;
    }

    /// 确认关闭：先完整保存，再把状态写为已关闭
    pub async fn confirm_close(&self, confirmation: CloseConfirmation) -> Result<CaseStatus> {
        {
            let mut state = self.state.write().await;
            let pending = state.pending_close.take();
            let open_id = state.open.as_ref().map(|open| open.case.case_id.as_str());
            if pending.as_deref() != Some(confirmation.case_id.as_str())
                || open_id != Some(confirmation.case_id.as_str())
            {
                return Err(CaseflowError::Validation(format!(
                    "close of case {} was not confirmed",
                    confirmation.case_id
                )));
            }
        }

        let receipt = self.save().await?;
        let closed = self.machine.transition(receipt.status, CaseEvent::Close)?;
        self.write_status(&receipt.case_id, closed).await?;

        info!("Closed case {}", receipt.case_id);
        Ok(closed)
    }

    /// 重新打开已关闭病例
    pub async fn reopen(&self) -> Result<CaseStatus> {
        let (case_id, status) = {
            let state = self.state.read().await;
            let open = state.open.as_ref().ok_or_else(no_open_case)?;
            (open.case.case_id.clone(), open.case.case_status)
        };

        let next = self.machine.transition(status, CaseEvent::Reopen)?;
        self.write_status(&case_id, next).await?;

        info!("Reopened case {}", case_id);
        Ok(next)
    }

    /// 写入服务端状态并同步本地副本
    async fn write_status(&self, case_id: &str, status: CaseStatus) -> Result<()> {
        self.gateway
            .update_case_status(case_id, status)
            .await
            .map_err(|e| {
                error!("Failed to set case {} to {}: {}", case_id, status, e);
                e
            })?;

        let mut state = self.state.write().await;
        if let Some(open) = state.open_for(case_id) {
            open.case.case_status = status;
            open.case.updated_at = Utc::now().max(open.case.created_at);
        }
        Ok(())
    }

    async fn is_active(&self, case_id: &str) -> bool {
        self.state.read().await.active_case_id.as_deref() == Some(case_id)
    }

    async fn discard_local(&self, case_id: &str) {
        if let Err(e) = self.store.clear(case_id).await {
            warn!("Failed to clear local draft for case {}: {}", case_id, e);
        }
    }
}

fn no_open_case() -> CaseflowError {
    CaseflowError::NotFound("no case is open".to_string())
}

/// 保存前的本地校验，返回诊断所挂的 scan_id
fn validate_for_save(case: &CaseRecord, draft: &DiagnosisDraft) -> Result<String> {
    if !draft.has_final_diagnosis() {
        return Err(CaseflowError::Validation(
            "final diagnosis must not be empty".to_string(),
        ));
    }
    case.scan_id.clone().ok_or_else(|| {
        CaseflowError::Validation(format!("case {} has no scan to attach a diagnosis to", case.case_id))
    })
}

fn sanitize_ratings(mut draft: DiagnosisDraft) -> DiagnosisDraft {
    if validate_rating(draft.ai_image_rating).is_err() {
        draft.ai_image_rating = DEFAULT_RATING;
    }
    if validate_rating(draft.llm_narrative_rating).is_err() {
        draft.llm_narrative_rating = DEFAULT_RATING;
    }
    draft
}
