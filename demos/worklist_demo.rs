//! 工作列表演示程序
//!
//! 展示时间窗口、排序与 AI 优先级切换、分页，以及病例的编辑、保存、关闭和重新打开

use caseflow_admin::{init_tracing, LoggingConfig};
use caseflow_core::utils::CaseInsight;
use caseflow_core::{CaseRecord, CaseStatus, PriorityRank, ScanRecord};
use caseflow_gateway::{MemoryDraftStore, MemoryGateway};
use caseflow_workflow::{CaseDraftWorkflow, CaseRepository, Timeframe, ViewState, WorklistPage};
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;

const DOCTOR_ID: &str = "doc-house";
const DOCTOR_EMAIL: &str = "house@clinic.test";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    })?;

    println!("🚀 Caseflow 工作列表演示\n");

    // 1. 准备网关数据
    let gateway = Arc::new(seed_gateway().await);
    println!("✅ 数据网关已就绪");

    // 2. 加载医生病例集
    let mut repository = CaseRepository::new(gateway.clone());
    let loaded = repository.load(Some(DOCTOR_EMAIL)).await?.len();
    println!("✅ 为 {} 加载了 {} 个病例", DOCTOR_EMAIL, loaded);

    // 3. 视图：默认一周、最新优先
    let mut state = ViewState::new(3, Timeframe::Week, Default::default());
    print_page("默认视图", &repository.view(&state, Utc::now()));

    state.toggle_ai_sort();
    print_page("AI 优先级排序", &repository.view(&state, Utc::now()));

    state.go_to_page(2);
    print_page("第 2 页", &repository.view(&state, Utc::now()));

    state.set_timeframe(Timeframe::Year);
    print_page("一年窗口", &repository.view(&state, Utc::now()));

    state.undo_timeframe();
    state.toggle_ai_sort();
    state.set_search_query("ms");
    print_page("搜索 \"ms\"", &repository.view(&state, Utc::now()));

    // 4. 打开病例并编辑草稿
    let workflow = CaseDraftWorkflow::new(gateway.clone(), Arc::new(MemoryDraftStore::new()));
    if let Some(snapshot) = workflow.open_from(&repository, "case-001").await?.current() {
        println!("\n📋 打开病例 {} (草稿来源: {:?})", snapshot.case.case_id, snapshot.source);
    }
    if let Some(Some(scan)) = workflow.load_scan().await?.current() {
        println!("   影像: {} {}", scan.scan_type, scan.image_storage_path);
    }

    workflow.set_final_diagnosis("Relapsing-remitting MS").await?;
    workflow.set_image_rating(4).await?;
    workflow.set_narrative_rating(5).await?;

    // 5. 保存、关闭、重新打开
    let receipt = workflow.save().await?;
    repository.record_status(&receipt.case_id, receipt.status)?;
    println!("💾 已保存，病例状态: {}", receipt.status);

    let confirmation = workflow.request_close().await?;
    let closed = workflow.confirm_close(confirmation).await?;
    repository.record_status("case-001", closed)?;
    println!("🔒 已关闭，病例状态: {}", closed);

    let reopened = workflow.reopen().await?;
    repository.record_status("case-001", reopened)?;
    println!("🔓 已重新打开，病例状态: {}", reopened);

    println!("\n📊 服务端诊断记录: {}", gateway.diagnoses().await.len());
    println!("\n🎉 演示完成");
    Ok(())
}

fn print_page(title: &str, page: &WorklistPage) {
    println!(
        "\n📄 {} ({} / {}, 第 {}/{} 页, 共 {} 个)",
        title,
        page.timeframe,
        page.strategy,
        page.current_page,
        page.total_pages,
        page.total_records
    );
    for record in &page.records {
        let insight = CaseInsight::from_record(record);
        println!(
            "   {} {:<18} {:<7} {:<10} {}",
            record.case_id,
            record.patient_name,
            insight.status_label,
            insight.priority_label,
            insight.ai_diagnosis_label.unwrap_or_default()
        );
    }
    println!("   页码: {:?}", page.page_window);
}

async fn seed_gateway() -> MemoryGateway {
    let gateway = MemoryGateway::new();
    gateway.add_doctor(DOCTOR_ID, DOCTOR_EMAIL).await;

    let patients = [
        ("case-001", "Amal Hassan", 2, "ms", PriorityRank::High, 91.0),
        ("case-002", "Omar Farouk", 20, "alzheimer", PriorityRank::Low, 64.0),
        ("case-003", "Layla Nasser", 30, "cancer", PriorityRank::Critical, 88.0),
        ("case-004", "Youssef Adel", 50, "ms", PriorityRank::NonUrgent, 47.0),
        ("case-005", "Mona Said", 90, "cancer", PriorityRank::High, 79.0),
        ("case-006", "Karim Zaki", 24 * 40, "alzheimer", PriorityRank::Low, 58.0),
    ];

    for (case_id, name, hours_ago, condition, rank, confidence) in patients {
        let created_at = Utc::now() - Duration::hours(hours_ago);
        let scan_id = format!("scan-{}", &case_id[5..]);

        gateway
            .add_case(CaseRecord {
                case_id: case_id.to_string(),
                patient_id: format!("patient-{}", &case_id[5..]),
                patient_name: name.to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap_or_default(),
                gender: None,
                national_id: "29805170100000".to_string(),
                patient_phone_number: "01000000000".to_string(),
                medical_history: None,
                case_status: CaseStatus::Queued,
                created_at,
                updated_at: created_at,
                initial_diagnosis: Some(format!("Suspected {}", condition)),
                final_diagnosis: None,
                notes: None,
                diagnosis_confirmed_by: Some(DOCTOR_ID.to_string()),
                scan_id: Some(scan_id.clone()),
                ai_diagnosis_id: Some(format!("ai-{}", &case_id[5..])),
                ai_diagnosis: Some(condition.to_string()),
                ai_confidence_score: Some(confidence),
                ai_priority_rank: Some(rank),
                llm_generated_patient_history: None,
            })
            .await;

        gateway
            .add_scan(ScanRecord {
                scan_id: scan_id.clone(),
                image_storage_path: format!("scans/{}.png", scan_id),
                scan_type: "MRI".to_string(),
                scan_date: created_at,
                clinical_notes: None,
            })
            .await;
    }

    gateway
}
