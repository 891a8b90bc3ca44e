use crate::constants::deploy;
use crate::error::Result;
use crate::service::ServiceSpec;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// docker-compose 文件（只覆盖 rigger 生成的字段）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, ExternalNetwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposeService {
    pub build: String,
    pub container_name: String,
    pub restart: String,
    pub ports: Vec<String>,
    pub env_file: Vec<String>,
    pub volumes: Vec<String>,
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalNetwork {
    pub external: bool,
}

impl ComposeFile {
    /// 单服务的 compose 文件：端口映射、.env、logs/data 两个挂载、外部网络
    pub fn for_service(spec: &ServiceSpec, network: &str) -> Self {
        let service = ComposeService {
            build: ".".to_string(),
            container_name: spec.name.to_string(),
            restart: "unless-stopped".to_string(),
            ports: vec![spec.port.compose_entry()],
            env_file: vec![deploy::ENV_FILE_NAME.to_string()],
            volumes: vec![
                format!("./{}:{}", deploy::LOGS_DIR_NAME, deploy::CONTAINER_LOGS_PATH),
                format!("./{}:{}", deploy::DATA_DIR_NAME, deploy::CONTAINER_DATA_PATH),
            ],
            networks: vec![network.to_string()],
        };

        let mut services = BTreeMap::new();
        services.insert(spec.name.to_string(), service);

        let mut networks = BTreeMap::new();
        networks.insert(network.to_string(), ExternalNetwork { external: true });

        Self { services, networks }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// 带生成说明头部的 YAML
    pub fn render(&self) -> Result<String> {
        let mut out = super::generated_header(deploy::COMPOSE_FILE_NAME, Local::now());
        out.push_str(&self.to_yaml()?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{PortMapping, ServiceName};

    fn spec() -> ServiceSpec {
        ServiceSpec::new(
            ServiceName::parse("billing").unwrap(),
            PortMapping::parse("8081:8000").unwrap(),
        )
    }

    #[test]
    fn test_compose_shape() {
        let compose = ComposeFile::for_service(&spec(), "app-network");
        let service = &compose.services["billing"];

        assert_eq!(compose.services.len(), 1);
        assert_eq!(service.ports, vec!["8081:8000"]);
        assert_eq!(service.env_file, vec![".env"]);
        assert_eq!(service.volumes.len(), 2);
        assert_eq!(service.volumes[0], "./logs:/app/logs");
        assert_eq!(service.networks, vec!["app-network"]);
        assert!(compose.networks["app-network"].external);
    }

    #[test]
    fn test_compose_yaml_parses_back() {
        let compose = ComposeFile::for_service(&spec(), "shared");
        let yaml = compose.render().unwrap();

        assert!(yaml.starts_with("# docker-compose.yml"));
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            value["networks"]["shared"]["external"],
            serde_yaml::Value::Bool(true)
        );
        assert_eq!(
            value["services"]["billing"]["container_name"],
            serde_yaml::Value::String("billing".to_string())
        );

        let parsed: ComposeFile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, compose);
    }
}
