//! 内存数据网关
//!
//! 进程内保存病例、影像与诊断记录，可从 JSON 夹具加载并回写

use crate::gateway::DataGateway;
use async_trait::async_trait;
use caseflow_core::{
    CaseRecord, CaseStatus, CaseflowError, DiagnosisRecord, Result, ScanRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// 医生账号：登录邮箱与医生标识
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorAccount {
    pub doctor_id: String,
    pub email: String,
}

/// JSON 夹具
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub doctors: Vec<DoctorAccount>,
    #[serde(default)]
    pub cases: Vec<CaseRecord>,
    #[serde(default)]
    pub scans: Vec<ScanRecord>,
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisRecord>,
}

impl Fixture {
    /// 从文件读取夹具
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let fixture = serde_json::from_str(&content)?;
        Ok(fixture)
    }

    /// 写回文件
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }
}

/// 内存数据网关
#[derive(Debug, Default)]
pub struct MemoryGateway {
    doctors: RwLock<Vec<DoctorAccount>>,
    cases: RwLock<Vec<CaseRecord>>,
    scans: RwLock<HashMap<String, ScanRecord>>,
    diagnoses: RwLock<Vec<DiagnosisRecord>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由夹具构建网关
    pub fn from_fixture(fixture: Fixture) -> Self {
        let scans = fixture
            .scans
            .into_iter()
            .map(|scan| (scan.scan_id.clone(), scan))
            .collect();

        Self {
            doctors: RwLock::new(fixture.doctors),
            cases: RwLock::new(fixture.cases),
            scans: RwLock::new(scans),
            diagnoses: RwLock::new(fixture.diagnoses),
        }
    }

    /// 导出当前数据为夹具
    pub async fn snapshot(&self) -> Fixture {
        let mut scans: Vec<ScanRecord> = self.scans.read().await.values().cloned().collect();
        scans.sort_by(|a, b| a.scan_id.cmp(&b.scan_id));

        Fixture {
            doctors: self.doctors.read().await.clone(),
            cases: self.cases.read().await.clone(),
            scans,
            diagnoses: self.diagnoses.read().await.clone(),
        }
    }

    pub async fn add_doctor(&self, doctor_id: &str, email: &str) {
        self.doctors.write().await.push(DoctorAccount {
            doctor_id: doctor_id.to_string(),
            email: email.to_string(),
        });
    }

    pub async fn add_case(&self, record: CaseRecord) {
        self.cases.write().await.push(record);
    }

    pub async fn add_scan(&self, scan: ScanRecord) {
        self.scans.write().await.insert(scan.scan_id.clone(), scan);
    }

    pub async fn add_diagnosis(&self, record: DiagnosisRecord) {
        self.diagnoses.write().await.push(record);
    }

    /// 查询已存储的诊断记录
    pub async fn diagnoses(&self) -> Vec<DiagnosisRecord> {
        self.diagnoses.read().await.clone()
    }

    /// 查询病例当前状态
    pub async fn case_status(&self, case_id: &str) -> Option<CaseStatus> {
        self.cases
            .read()
            .await
            .iter()
            .find(|c| c.case_id == case_id)
            .map(|c| c.case_status)
    }
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn fetch_cases_for_doctor(&self, email: &str) -> Result<Vec<CaseRecord>> {
        let doctor_id = self
            .doctors
            .read()
            .await
            .iter()
            .find(|d| d.email.eq_ignore_ascii_case(email))
            .map(|d| d.doctor_id.clone());

        let Some(doctor_id) = doctor_id else {
            debug!("No doctor account for {}, returning empty case set", email);
            return Ok(Vec::new());
        };

        let cases: Vec<CaseRecord> = self
            .cases
            .read()
            .await
            .iter()
            .filter(|c| c.diagnosis_confirmed_by.as_deref() == Some(doctor_id.as_str()))
            .cloned()
            .collect();

        debug!("Fetched {} cases for doctor {}", cases.len(), doctor_id);
        Ok(cases)
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<ScanRecord> {
        self.scans
            .read()
            .await
            .get(scan_id)
            .cloned()
            .ok_or_else(|| CaseflowError::NotFound(format!("Scan {} not found", scan_id)))
    }

    async fn fetch_diagnosis(&self, scan_id: &str, doctor_id: &str) -> Result<Option<DiagnosisRecord>> {
        Ok(self
            .diagnoses
            .read()
            .await
            .iter()
            .find(|d| d.scan_id == scan_id && d.doctor_id.as_deref() == Some(doctor_id))
            .cloned())
    }

    async fn update_case_status(&self, case_id: &str, status: CaseStatus) -> Result<()> {
        let mut cases = self.cases.write().await;
        let record = cases
            .iter_mut()
            .find(|c| c.case_id == case_id)
            .ok_or_else(|| CaseflowError::NotFound(format!("Case {} not found", case_id)))?;

        record.case_status = status;
        record.updated_at = chrono::Utc::now().max(record.created_at);

        info!("Case {} status set to {}", case_id, status);
        Ok(())
    }

    async fn upsert_diagnosis(&self, mut record: DiagnosisRecord) -> Result<DiagnosisRecord> {
        let mut diagnoses = self.diagnoses.write().await;

        match record.doctor_diagnosis_id.clone() {
            Some(id) => {
                let existing = diagnoses
                    .iter_mut()
                    .find(|d| d.doctor_diagnosis_id.as_deref() == Some(id.as_str()))
                    .ok_or_else(|| {
                        CaseflowError::NotFound(format!("Doctor diagnosis {} not found", id))
                    })?;
                *existing = record.clone();
                info!("Updated doctor diagnosis {}", id);
            }
            None => {
                let id = Uuid::new_v4().to_string();
                record.doctor_diagnosis_id = Some(id.clone());
                diagnoses.push(record.clone());
                info!("Inserted doctor diagnosis {} for scan {}", id, record.scan_id);
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn case(case_id: &str, doctor_id: &str) -> CaseRecord {
        let now = Utc::now();
        CaseRecord {
            case_id: case_id.to_string(),
            patient_id: format!("p-{}", case_id),
            patient_name: "Test Patient".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            gender: None,
            national_id: "000".to_string(),
            patient_phone_number: "555".to_string(),
            medical_history: None,
            case_status: CaseStatus::Queued,
            created_at: now,
            updated_at: now,
            initial_diagnosis: None,
            final_diagnosis: None,
            notes: None,
            diagnosis_confirmed_by: Some(doctor_id.to_string()),
            scan_id: Some(format!("s-{}", case_id)),
            ai_diagnosis_id: None,
            ai_diagnosis: None,
            ai_confidence_score: None,
            ai_priority_rank: None,
            llm_generated_patient_history: None,
        }
    }

    fn diagnosis(scan_id: &str, doctor_id: &str) -> DiagnosisRecord {
        let now = Utc::now();
        DiagnosisRecord {
            doctor_diagnosis_id: None,
            scan_id: scan_id.to_string(),
            doctor_id: Some(doctor_id.to_string()),
            ai_diagnosis_id: None,
            ai_image_analysis_rating: Some(4),
            llm_narrative_rating: Some(2),
            final_doctor_diagnosis: Some("MS".to_string()),
            feedback_comments: None,
            created_by: Some(doctor_id.to_string()),
            updated_by: Some(doctor_id.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_fetch_cases_scoped_to_doctor() {
        let gateway = MemoryGateway::new();
        gateway.add_doctor("doc-1", "house@clinic.test").await;
        gateway.add_case(case("c-1", "doc-1")).await;
        gateway.add_case(case("c-2", "doc-2")).await;

        let cases = gateway.fetch_cases_for_doctor("HOUSE@clinic.test").await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].case_id, "c-1");

        let none = gateway.fetch_cases_for_doctor("nobody@clinic.test").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let gateway = MemoryGateway::new();

        let stored = gateway.upsert_diagnosis(diagnosis("s-1", "doc-1")).await.unwrap();
        let id = stored.doctor_diagnosis_id.clone().unwrap();

        let mut changed = stored.clone();
        changed.final_doctor_diagnosis = Some("Alzheimer".to_string());
        gateway.upsert_diagnosis(changed).await.unwrap();

        let all = gateway.diagnoses().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].doctor_diagnosis_id.as_deref(), Some(id.as_str()));
        assert_eq!(all[0].final_doctor_diagnosis.as_deref(), Some("Alzheimer"));

        let fetched = gateway.fetch_diagnosis("s-1", "doc-1").await.unwrap();
        assert!(fetched.is_some());
        assert!(gateway.fetch_diagnosis("s-1", "doc-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let gateway = MemoryGateway::new();

        let result = gateway.update_case_status("missing", CaseStatus::Active).await;
        assert!(matches!(result, Err(CaseflowError::NotFound(_))));

        let result = gateway.fetch_scan("missing").await;
        assert!(matches!(result, Err(CaseflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_status_update_never_predates_creation() {
        let gateway = MemoryGateway::new();
        let mut record = case("c-1", "doc-1");
        record.created_at = Utc::now() + chrono::Duration::hours(2);
        record.updated_at = record.created_at;
        gateway.add_case(record).await;

        gateway.update_case_status("c-1", CaseStatus::Active).await.unwrap();

        let stored = &gateway.snapshot().await.cases[0];
        assert_eq!(stored.case_status, CaseStatus::Active);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_fixture_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");

        let gateway = MemoryGateway::new();
        gateway.add_doctor("doc-1", "house@clinic.test").await;
        gateway.add_case(case("c-1", "doc-1")).await;
        gateway.update_case_status("c-1", CaseStatus::Active).await.unwrap();
        gateway.snapshot().await.save(&path).await.unwrap();

        let reloaded = MemoryGateway::from_fixture(Fixture::load(&path).await.unwrap());
        assert_eq!(reloaded.case_status("c-1").await, Some(CaseStatus::Active));
    }
}
