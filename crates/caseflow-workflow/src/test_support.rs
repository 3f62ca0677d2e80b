//! 测试辅助：病例构造与可编排的网关

use async_trait::async_trait;
use caseflow_core::{
    CaseRecord, CaseStatus, CaseflowError, DiagnosisRecord, PriorityRank, Result, ScanRecord,
};
use caseflow_gateway::{DataGateway, MemoryGateway};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

pub(crate) fn case_created_at(case_id: &str, created_at: DateTime<Utc>) -> CaseRecord {
    CaseRecord {
        case_id: case_id.to_string(),
        patient_id: format!("p-{}", case_id),
        patient_name: format!("Patient {}", case_id),
        date_of_birth: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
        gender: None,
        national_id: "00000000000000".to_string(),
        patient_phone_number: "0100000000".to_string(),
        medical_history: None,
        case_status: CaseStatus::Queued,
        created_at,
        updated_at: created_at,
        initial_diagnosis: None,
        final_diagnosis: None,
        notes: None,
        diagnosis_confirmed_by: Some("doc-1".to_string()),
        scan_id: Some(format!("s-{}", case_id)),
        ai_diagnosis_id: Some(format!("ai-{}", case_id)),
        ai_diagnosis: None,
        ai_confidence_score: None,
        ai_priority_rank: None,
        llm_generated_patient_history: None,
    }
}

pub(crate) fn case_with_priority(case_id: &str, rank: Option<PriorityRank>) -> CaseRecord {
    let mut record = case_created_at(case_id, Utc::now());
    record.ai_priority_rank = rank;
    record
}

pub(crate) fn case_with_status(case_id: &str, status: CaseStatus) -> CaseRecord {
    let mut record = case_created_at(case_id, Utc::now());
    record.case_status = status;
    record
}

/// 可打开的病例：有影像、有负责医生、AI 优先级为 High
pub(crate) fn open_case(case_id: &str, status: CaseStatus) -> CaseRecord {
    let mut record = case_with_status(case_id, status);
    record.ai_priority_rank = Some(PriorityRank::High);
    record.ai_diagnosis = Some("ms".to_string());
    record.ai_confidence_score = Some(82.0);
    record
}

pub(crate) fn scan(scan_id: &str) -> ScanRecord {
    ScanRecord {
        scan_id: scan_id.to_string(),
        image_storage_path: format!("scans/{}.png", scan_id),
        scan_type: "MRI".to_string(),
        scan_date: Utc::now(),
        clinical_notes: None,
    }
}

/// 包装内存网关：记录调用、注入写入失败、挂起读取
pub(crate) struct ScriptedGateway {
    inner: MemoryGateway,
    pub fail_status_writes: AtomicBool,
    pub fail_upserts: AtomicBool,
    /// 置位后 fetch_scan / fetch_diagnosis 通知 `entered` 并等待 `release`
    pub hold_reads: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedGateway {
    pub fn new(inner: MemoryGateway) -> Self {
        Self {
            inner,
            fail_status_writes: AtomicBool::new(false),
            fail_upserts: AtomicBool::new(false),
            hold_reads: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &MemoryGateway {
        &self.inner
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    pub fn total_calls_to_writes(&self) -> usize {
        self.calls_to("update_case_status") + self.calls_to("upsert_diagnosis")
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }

    async fn maybe_hold(&self) {
        if self.hold_reads.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl DataGateway for ScriptedGateway {
    async fn fetch_cases_for_doctor(&self, email: &str) -> Result<Vec<CaseRecord>> {
        self.record("fetch_cases_for_doctor");
        self.inner.fetch_cases_for_doctor(email).await
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<ScanRecord> {
        self.record("fetch_scan");
        self.maybe_hold().await;
        self.inner.fetch_scan(scan_id).await
    }

    async fn fetch_diagnosis(&self, scan_id: &str, doctor_id: &str) -> Result<Option<DiagnosisRecord>> {
        self.record("fetch_diagnosis");
        self.maybe_hold().await;
        self.inner.fetch_diagnosis(scan_id, doctor_id).await
    }

    async fn update_case_status(&self, case_id: &str, status: CaseStatus) -> Result<()> {
        self.record("update_case_status");
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(CaseflowError::Gateway("status write rejected".to_string()));
        }
        self.inner.update_case_status(case_id, status).await
    }

    async fn upsert_diagnosis(&self, record: DiagnosisRecord) -> Result<DiagnosisRecord> {
        self.record("upsert_diagnosis");
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(CaseflowError::Gateway("diagnosis write rejected".to_string()));
        }
        self.inner.upsert_diagnosis(record).await
    }
}
