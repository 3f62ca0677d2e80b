//! 本地草稿存储
//!
//! 按病例保存未同步的诊断草稿，仅用于崩溃或刷新后的恢复。
//! 键格式为 `case-<case_id>-progress`，值为 JSON 对象。

use async_trait::async_trait;
use caseflow_core::{CaseflowError, DiagnosisDraft, Result, DEFAULT_RATING};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// 病例草稿的存储键
pub fn draft_key(case_id: &str) -> String {
    format!("case-{}-progress", case_id)
}

/// 本地草稿的 JSON 格式
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalDraftPayload {
    #[serde(default)]
    pub final_diagnosis: Option<String>,
    #[serde(default)]
    pub feedback_comments: Option<String>,
    /// 单元素数组；按 i64 解码，越界值不影响其余字段
    #[serde(default)]
    pub ai_image_rating: Option<Vec<i64>>,
    #[serde(default)]
    pub llm_narrative_rating: Option<Vec<i64>>,
}

impl From<&DiagnosisDraft> for LocalDraftPayload {
    fn from(draft: &DiagnosisDraft) -> Self {
        Self {
            final_diagnosis: Some(draft.final_diagnosis.clone()),
            feedback_comments: Some(draft.feedback_comments.clone()),
            ai_image_rating: Some(vec![i64::from(draft.ai_image_rating)]),
            llm_narrative_rating: Some(vec![i64::from(draft.llm_narrative_rating)]),
        }
    }
}

impl From<LocalDraftPayload> for DiagnosisDraft {
    fn from(payload: LocalDraftPayload) -> Self {
        let first = |rating: Option<Vec<i64>>| {
            rating
                .and_then(|values| values.first().copied())
                .and_then(|value| u8::try_from(value).ok())
                .unwrap_or(DEFAULT_RATING)
        };

        Self {
            final_diagnosis: payload.final_diagnosis.unwrap_or_default(),
            feedback_comments: payload.feedback_comments.unwrap_or_default(),
            ai_image_rating: first(payload.ai_image_rating),
            llm_narrative_rating: first(payload.llm_narrative_rating),
        }
    }
}

fn encode(draft: &DiagnosisDraft) -> Result<String> {
    Ok(serde_json::to_string(&LocalDraftPayload::from(draft))?)
}

fn decode(raw: &str) -> Result<DiagnosisDraft> {
    let payload: LocalDraftPayload = serde_json::from_str(raw)?;
    Ok(payload.into())
}

/// 草稿存储接口，按病例隔离，写入为最后写入者胜出
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// 读取病例草稿
    async fn read(&self, case_id: &str) -> Result<Option<DiagnosisDraft>>;

    /// 覆盖写入病例草稿
    async fn write(&self, case_id: &str, draft: &DiagnosisDraft) -> Result<()>;

    /// 清除病例草稿
    async fn clear(&self, case_id: &str) -> Result<()>;
}

/// 内存草稿存储
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入原始 JSON
    pub async fn put_raw(&self, case_id: &str, raw: &str) {
        self.entries
            .write()
            .await
            .insert(draft_key(case_id), raw.to_string());
    }

    /// 读取原始 JSON
    pub async fn get_raw(&self, case_id: &str) -> Option<String> {
        self.entries.read().await.get(&draft_key(case_id)).cloned()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn read(&self, case_id: &str) -> Result<Option<DiagnosisDraft>> {
        match self.entries.read().await.get(&draft_key(case_id)) {
            Some(raw) => decode(raw).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, case_id: &str, draft: &DiagnosisDraft) -> Result<()> {
        let raw = encode(draft)?;
        self.entries.write().await.insert(draft_key(case_id), raw);
        Ok(())
    }

    async fn clear(&self, case_id: &str) -> Result<()> {
        self.entries.write().await.remove(&draft_key(case_id));
        Ok(())
    }
}

/// 文件草稿存储，每个病例一个 JSON 文件
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    directory: PathBuf,
}

impl FileDraftStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, case_id: &str) -> Result<PathBuf> {
        if case_id.is_empty() || case_id.contains(['/', '\\']) || case_id.contains("..") {
            return Err(CaseflowError::Validation(format!(
                "case id {:?} cannot be used as a draft key",
                case_id
            )));
        }
        Ok(self.directory.join(format!("{}.json", draft_key(case_id))))
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn read(&self, case_id: &str) -> Result<Option<DiagnosisDraft>> {
        let path = self.path_for(case_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => decode(&raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, case_id: &str, draft: &DiagnosisDraft) -> Result<()> {
        let path = self.path_for(case_id)?;
        tokio::fs::create_dir_all(&self.directory).await?;
        tokio::fs::write(&path, encode(draft)?).await?;
        debug!("Wrote local draft {}", path.display());
        Ok(())
    }

    async fn clear(&self, case_id: &str) -> Result<()> {
        let path = self.path_for(case_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
