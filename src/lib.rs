//! # Caseflow
//!
//! 医生病例工作列表与诊断工作流的统一入口

pub use caseflow_admin;
pub use caseflow_core;
pub use caseflow_gateway;
pub use caseflow_workflow;
