mod check;
mod deploy;
mod env;
mod network;
mod runner;
mod service;
mod workflow;

// Runner commands
pub use runner::{run_runner_reset, run_runner_status};

// Service commands
pub use service::{
    AddOptions, run_logs_dir, run_service_add, run_service_down, run_service_list, run_service_ps,
};

// Env commands
pub use env::{run_env_fix_perms, run_env_get, run_env_list, run_env_set, run_env_unset};

pub use check::run_check;
pub use deploy::run_deploy;
pub use network::run_network_ensure;
pub use workflow::run_workflow;
