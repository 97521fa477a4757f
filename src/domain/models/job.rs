// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 爬取作业实体
///
/// 表示针对某个网站目录的一次计划爬取。作业由外部系统创建，
/// 状态转换只能经由调度器完成：
/// Created → Running → Finished/Failed
///
/// 一旦到达 Finished 或 Failed 状态，作业即为终态，不会被复活。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// 作业唯一标识符（数据库自增ID，调度按其升序选取）
    pub id: i64,
    /// 关联的爬取配置编码
    pub config_code: String,
    /// 网站编码，同一网站同时只允许一个 Running 作业
    pub website_code: String,
    /// 作业类型，调度器只消费 CRAWL 类型
    pub job_type: String,
    /// 作业状态
    pub status: JobStatus,
    /// 测试运行标记，为 true 时页数上限强制为 2
    pub test_run: bool,
    /// 开始执行时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 结束时间（成功或失败）
    pub finished_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created: DateTime<FixedOffset>,
    /// 最后修改时间
    pub modified: DateTime<FixedOffset>,
    /// 最后修改者
    pub modified_by: String,
}

impl CrawlJob {
    /// 判断作业是否处于终态
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Finished | JobStatus::Failed)
    }
}

/// 作业状态枚举
///
/// 状态转换遵循以下流程：
/// Created → Running → Finished/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// 已创建，等待调度
    #[default]
    Created,
    /// 执行中
    Running,
    /// 已完成
    Finished,
    /// 已失败
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "Created"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Finished => write!(f, "Finished"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(JobStatus::Created),
            "Running" => Ok(JobStatus::Running),
            "Finished" => Ok(JobStatus::Finished),
            "Failed" => Ok(JobStatus::Failed),
            _ => Err(()),
        }
    }
}
