use super::shell_quote;
use crate::config::CiConfig;
use crate::constants::{ci, deploy};
use crate::error::Result;
use crate::service::ServiceSpec;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// CI 工作流文件：push 触发，test 任务在容器中运行测试，deploy 任务同步文件并启动服务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub name: String,
    pub on: WorkflowTrigger,
    pub jobs: BTreeMap<String, WorkflowJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowTrigger {
    pub push: PushTrigger,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushTrigger {
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs: Option<String>,
    #[serde(rename = "runs-on")]
    pub runs_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<JobContainer>,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobContainer {
    pub image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(
        default,
        rename = "working-directory",
        skip_serializing_if = "Option::is_none"
    )]
    pub working_directory: Option<String>,
}

impl WorkflowStep {
    fn checkout() -> Self {
        Self {
            uses: Some(ci::CHECKOUT_ACTION.to_string()),
            ..Default::default()
        }
    }

    fn run(name: &str, script: String) -> Self {
        Self {
            name: Some(name.to_string()),
            run: Some(script),
            ..Default::default()
        }
    }
}

impl Workflow {
    /// 工作流文件名（相对于仓库根目录）
    pub fn file_path(spec: &ServiceSpec) -> String {
        format!("{}/deploy-{}.yml", ci::WORKFLOW_DIR, spec.name)
    }

    pub fn for_service(
        spec: &ServiceSpec,
        ci_config: &CiConfig,
        deploy_dir: &Path,
        excludes: &[String],
        dir_mode: u32,
        env_mode: u32,
    ) -> Self {
        let test = WorkflowJob {
            needs: None,
            runs_on: ci_config.runner_labels.clone(),
            container: Some(JobContainer {
                image: ci_config.test_image.clone(),
            }),
            steps: vec![
                WorkflowStep::checkout(),
                WorkflowStep::run("Run tests", ci_config.test_command.clone()),
            ],
        };

        let deploy_dir = deploy_dir.to_string_lossy();
        let deploy = WorkflowJob {
            needs: Some("test".to_string()),
            runs_on: ci_config.runner_labels.clone(),
            container: None,
            steps: vec![
                WorkflowStep::checkout(),
                WorkflowStep::run(
                    "Sync files",
                    sync_script(spec.name.as_str(), &deploy_dir, excludes, dir_mode, env_mode),
                ),
                WorkflowStep {
                    name: Some("Start service".to_string()),
                    run: Some("docker compose up -d --build --remove-orphans".to_string()),
                    working_directory: Some(deploy_dir.to_string()),
                    ..Default::default()
                },
            ],
        };

        let mut jobs = BTreeMap::new();
        jobs.insert("test".to_string(), test);
        jobs.insert("deploy".to_string(), deploy);

        Self {
            name: format!("deploy-{}", spec.name),
            on: WorkflowTrigger {
                push: PushTrigger {
                    branches: vec![ci_config.branch.clone()],
                },
            },
            jobs,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// 带生成说明头部的 YAML
    pub fn render(&self) -> Result<String> {
        let mut out = super::generated_header("workflow", Local::now());
        out.push_str(&self.to_yaml()?);
        Ok(out)
    }
}

/// 暂存 .env、rsync（排除 .env 与 logs/）、恢复 .env 并收紧权限
fn sync_script(
    service: &str,
    deploy_dir: &str,
    excludes: &[String],
    dir_mode: u32,
    env_mode: u32,
) -> String {
    let dir = shell_quote(deploy_dir);
    let stash = format!("\"$RUNNER_TEMP/{service}{}\"", deploy::ENV_FILE_NAME);
    let env_path = format!("{dir}/{}", deploy::ENV_FILE_NAME);

    let exclude_args = excludes
        .iter()
        .map(|e| format!("--exclude {}", shell_quote(e)))
        .collect::<Vec<_>>()
        .join(" ");

    [
        "set -euo pipefail".to_string(),
        format!("mkdir -p {dir}/{}", deploy::LOGS_DIR_NAME),
        format!("chmod {dir_mode:o} {dir}/{}", deploy::LOGS_DIR_NAME),
        format!("if [ -f {env_path} ]; then cp {env_path} {stash}; fi"),
        format!("rsync -a --delete {exclude_args} ./ {dir}/"),
        format!("if [ -f {stash} ]; then mv {stash} {env_path}; fi"),
        format!("if [ -f {env_path} ]; then chmod {env_mode:o} {env_path}; fi"),
    ]
    .join("\n")
        + "\n"
}
