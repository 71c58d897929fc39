//! Collaborator traits consumed by the domain (data supply, configuration).

pub mod config_port;
pub mod data_port;
