use crate::error::Result;
use crate::permissions::{PathCheck, PermissionManager};
use crate::provision::ServiceProvisioner;
use crate::service::ServiceName;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// 单个服务的检查结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceCheck {
    pub name: ServiceName,
    pub logs: PathCheck,
    /// .env 不存在时为空，不算违规
    pub env: Option<PathCheck>,
}

impl ServiceCheck {
    pub fn is_ok(&self) -> bool {
        self.logs.ok && self.env.as_ref().is_none_or(|e| e.ok)
    }
}

/// 权限检查报告
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckReport {
    pub runner_work_dir: PathCheck,
    pub services: Vec<ServiceCheck>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.runner_work_dir.ok && self.services.iter().all(ServiceCheck::is_ok)
    }

    /// 所有不符合要求的路径
    pub fn violations(&self) -> Vec<&PathCheck> {
        let mut out = Vec::new();
        if !self.runner_work_dir.ok {
            out.push(&self.runner_work_dir);
        }
        for service in &self.services {
            if !service.logs.ok {
                out.push(&service.logs);
            }
            if let Some(env) = service.env.as_ref().filter(|e| !e.ok) {
                out.push(env);
            }
        }
        out
    }
}

/// 校验 Runner 工作目录、各服务 logs 目录与 .env 的权限
pub struct HealthCheck<'a> {
    runner_permissions: &'a PermissionManager,
    service_permissions: &'a PermissionManager,
    provisioner: &'a ServiceProvisioner,
    dir_mode: u32,
}

impl<'a> HealthCheck<'a> {
    pub fn new(
        runner_permissions: &'a PermissionManager,
        service_permissions: &'a PermissionManager,
        provisioner: &'a ServiceProvisioner,
        dir_mode: u32,
    ) -> Self {
        Self {
            runner_permissions,
            service_permissions,
            provisioner,
            dir_mode,
        }
    }

    pub fn run(&self, work_dir: &Path) -> Result<CheckReport> {
        info!("🔍 检查目录权限...");
        let runner_work_dir = self.runner_permissions.inspect(work_dir, self.dir_mode);

        // .env 只检查权限位
        let env_inspector = PermissionManager::new(None);
        let layout = self.provisioner.layout();

        let mut services = Vec::new();
        for name in self.provisioner.list()? {
            let logs = self
                .service_permissions
                .inspect(&layout.logs_dir(&name), self.dir_mode);
            let env_path = layout.env_file(&name);
            let env = env_path
                .exists()
                .then(|| env_inspector.inspect(&env_path, self.provisioner.env_mode()));
            services.push(ServiceCheck { name, logs, env });
        }

        let report = CheckReport {
            runner_work_dir,
            services,
        };
        for violation in report.violations() {
            warn!(
                "⚠️  {}: 期望 mode {} owner {}，实际 {}",
                violation.path.display(),
                violation.expected_mode,
                violation.expected_owner.as_deref().unwrap_or("-"),
                if violation.exists {
                    format!(
                        "mode {} owner {}",
                        violation.mode.as_deref().unwrap_or("?"),
                        violation.owner.as_deref().unwrap_or("?")
                    )
                } else {
                    "不存在".to_string()
                }
            );
        }
        Ok(report)
    }
}
