//! # Caseflow Core
//!
//! 病例工作列表的核心模块，提供基础数据结构、错误定义和只读派生标签。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{CaseflowError, Result};
pub use models::*;
