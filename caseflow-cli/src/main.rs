//! Caseflow 命令行程序
//!
//! 以 JSON 夹具作为数据网关，浏览医生工作列表并编辑、保存、关闭病例诊断

use anyhow::{bail, Context, Result};
use caseflow_admin::{init_tracing, CaseflowConfig, DraftBackend};
use caseflow_core::utils::CaseInsight;
use caseflow_gateway::{DraftStore, FileDraftStore, Fixture, MemoryDraftStore, MemoryGateway};
use caseflow_workflow::{
    CaseDraftWorkflow, CaseRepository, CaseScope, CaseSnapshot, SortStrategy, Timeframe, ViewState,
    WorklistPage,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "caseflow")]
#[command(about = "Doctor worklist and case diagnosis workflow")]
struct Cli {
    /// JSON 夹具路径（病例、影像、诊断）
    #[arg(short, long, default_value = "./data/fixture.json")]
    fixture: PathBuf,

    /// 当前登录医生的邮箱
    #[arg(short, long)]
    email: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 显示工作列表的一页
    List(ListArgs),
    /// 打开病例并显示草稿
    Show {
        case_id: String,
        /// 同时加载影像记录
        #[arg(long)]
        scan: bool,
        #[arg(long)]
        json: bool,
    },
    /// 编辑草稿并写入本地草稿存储
    Edit {
        case_id: String,
        #[command(flatten)]
        edits: DraftEdits,
    },
    /// 保存诊断，病例转为处理中
    Save {
        case_id: String,
        #[command(flatten)]
        edits: DraftEdits,
    },
    /// 保存并关闭病例
    Close {
        case_id: String,
        #[command(flatten)]
        edits: DraftEdits,
        /// 确认关闭
        #[arg(long)]
        yes: bool,
    },
    /// 重新打开已关闭病例
    Reopen { case_id: String },
    /// 输出生效配置
    Config,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// hour/day/week/month/year
    #[arg(short, long)]
    timeframe: Option<String>,
    /// newest/oldest/status/priority
    #[arg(short, long)]
    sort: Option<String>,
    /// 按 AI 优先级排序
    #[arg(long)]
    ai: bool,
    #[arg(short = 'q', long)]
    search: Option<String>,
    #[arg(long, value_enum, default_value_t = ScopeArg::Open)]
    scope: ScopeArg,
    #[arg(short, long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct DraftEdits {
    #[arg(long)]
    diagnosis: Option<String>,
    #[arg(long)]
    feedback: Option<String>,
    /// AI 影像分析评分 1-5
    #[arg(long)]
    image_rating: Option<u8>,
    /// 叙述评分 1-5
    #[arg(long)]
    narrative_rating: Option<u8>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    Open,
    Closed,
    All,
}

impl From<ScopeArg> for CaseScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Open => CaseScope::Open,
            ScopeArg::Closed => CaseScope::Closed,
            ScopeArg::All => CaseScope::All,
        }
    }
}

/// 已加载的会话
struct Session {
    gateway: Arc<MemoryGateway>,
    repository: CaseRepository,
    workflow: CaseDraftWorkflow,
    fixture_path: PathBuf,
}

impl Session {
    async fn open(cli: &Cli, config: &CaseflowConfig) -> Result<Self> {
        let fixture = Fixture::load(&cli.fixture)
            .await
            .with_context(|| format!("Failed to load fixture {}", cli.fixture.display()))?;
        let gateway = Arc::new(MemoryGateway::from_fixture(fixture));

        let store: Arc<dyn DraftStore> = match config.drafts.backend {
            DraftBackend::Memory => Arc::new(MemoryDraftStore::new()),
            DraftBackend::File => {
                let directory = config
                    .drafts
                    .directory
                    .clone()
                    .context("File draft backend requires drafts.directory")?;
                Arc::new(FileDraftStore::new(directory))
            }
        };

        let mut repository = CaseRepository::new(gateway.clone());
        repository.load(cli.email.as_deref()).await?;

        Ok(Self {
            workflow: CaseDraftWorkflow::new(gateway.clone(), store),
            gateway,
            repository,
            fixture_path: cli.fixture.clone(),
        })
    }

    async fn open_case(&self, case_id: &str) -> Result<CaseSnapshot> {
        self.workflow
            .open_from(&self.repository, case_id)
            .await?
            .current()
            .with_context(|| format!("Case {} was superseded while opening", case_id))
    }

    async fn apply_edits(&self, edits: &DraftEdits) -> Result<()> {
        if let Some(text) = &edits.diagnosis {
            self.workflow.set_final_diagnosis(text.clone()).await?;
        }
        if let Some(text) = &edits.feedback {
            self.workflow.set_feedback_comments(text.clone()).await?;
        }
        if let Some(rating) = edits.image_rating {
            self.workflow.set_image_rating(rating).await?;
        }
        if let Some(rating) = edits.narrative_rating {
            self.workflow.set_narrative_rating(rating).await?;
        }
        Ok(())
    }

    /// 把网关数据写回夹具文件
    async fn persist(&self) -> Result<()> {
        persist_fixture(&self.gateway, &self.fixture_path).await
    }
}

async fn persist_fixture(gateway: &MemoryGateway, path: &Path) -> Result<()> {
    gateway
        .snapshot()
        .await
        .save(path)
        .await
        .with_context(|| format!("Failed to write fixture {}", path.display()))?;
    info!("Fixture written to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CaseflowConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config.logging)?;

    if let Command::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let session = Session::open(&cli, &config).await?;

    match &cli.command {
        Command::List(args) => {
            let state = list_state(args, &config);
            let page = session.repository.view(&state, Utc::now());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_page(&page);
            }
        }
        Command::Show { case_id, scan, json } => {
            let mut snapshot = session.open_case(case_id).await?;
            if *scan {
                snapshot.scan = session.workflow.load_scan().await?.current().flatten();
            }
            if *json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
        }
        Command::Edit { case_id, edits } => {
            session.open_case(case_id).await?;
            session.apply_edits(edits).await?;
            if let Some(snapshot) = session.workflow.snapshot().await {
                print_snapshot(&snapshot);
            }
        }
        Command::Save { case_id, edits } => {
            session.open_case(case_id).await?;
            session.apply_edits(edits).await?;

            let outcome = session.workflow.save().await;
            session.persist().await?;
            let receipt = outcome?;
            println!("Saved case {} ({})", receipt.case_id, receipt.status);
        }
        Command::Close { case_id, edits, yes } => {
            session.open_case(case_id).await?;
            session.apply_edits(edits).await?;

            let confirmation = session.workflow.request_close().await?;
            if !*yes {
                session.workflow.cancel_close().await;
                warn!("Close of case {} not confirmed", case_id);
                bail!("Closing case {} requires --yes", confirmation.case_id());
            }

            let outcome = session.workflow.confirm_close(confirmation).await;
            session.persist().await?;
            let status = outcome?;
            println!("Case {} is now {}", case_id, status);
        }
        Command::Reopen { case_id } => {
            session.open_case(case_id).await?;
            let status = session.workflow.reopen().await?;
            session.persist().await?;
            println!("Case {} is now {}", case_id, status);
        }
        Command::Config => {}
    }

    Ok(())
}

fn list_state(args: &ListArgs, config: &CaseflowConfig) -> ViewState {
    let worklist = &config.worklist;
    let timeframe = Timeframe::from_key(args.timeframe.as_deref().unwrap_or(&worklist.default_timeframe));
    let strategy = SortStrategy::from_key(args.sort.as_deref().unwrap_or(&worklist.default_sort));

    let mut state = ViewState::new(worklist.page_size, timeframe, strategy)
        .with_page_window(worklist.page_window)
        .with_scope(args.scope.into());
    if args.ai {
        state.toggle_ai_sort();
    }
    if let Some(query) = &args.search {
        state.set_search_query(query.clone());
    }
    state.go_to_page(args.page);
    state
}

fn print_page(page: &WorklistPage) {
    println!(
        "{:<14} {:<24} {:<8} {:<11} {}",
        "CASE", "PATIENT", "STATUS", "PRIORITY", "CREATED"
    );
    for record in &page.records {
        let insight = CaseInsight::from_record(record);
        println!(
            "{:<14} {:<24} {:<8} {:<11} {}",
            record.case_id,
            record.patient_name,
            insight.status_label,
            insight.priority_label,
            record.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    let window: Vec<String> = page
        .page_window
        .iter()
        .map(|p| if *p == page.current_page { format!("[{}]", p) } else { p.to_string() })
        .collect();
    println!(
        "\nPage {}/{}  {}  |  {} cases  |  {} / sort {}{}",
        page.current_page,
        page.total_pages,
        window.join(" "),
        page.total_records,
        page.timeframe,
        page.strategy,
        if page.ai_sort_active { " (AI)" } else { "" },
    );
}

fn print_snapshot(snapshot: &CaseSnapshot) {
    let case = &snapshot.case;
    let insight = &snapshot.insight;

    println!("Case {}  {}", case.case_id, insight.status_label);
    println!("  Patient:     {} ({})", case.patient_name, case.date_of_birth);
    if let Some(label) = &insight.ai_diagnosis_label {
        let confidence = insight
            .confidence_score
            .map(|score| format!(" {:.1}%", score))
            .unwrap_or_default();
        println!("  AI:          {}{}", label, confidence);
    }
    println!("  Priority:    {}", insight.priority_label);
    if let Some(scan) = &snapshot.scan {
        println!("  Scan:        {} {} ({})", scan.scan_type, scan.scan_id, scan.image_storage_path);
    }
    println!("  Draft ({:?}):", snapshot.source);
    println!("    Diagnosis: {}", snapshot.draft.final_diagnosis);
    println!("    Feedback:  {}", snapshot.draft.feedback_comments);
    println!(
        "    Ratings:   image {} / narrative {}",
        snapshot.draft.ai_image_rating, snapshot.draft.llm_narrative_rating
    );
}
