// Public API
pub mod cli;
pub mod commands;

// Core domain types
mod activation;
mod catalog;
mod config;
mod engine;
mod orchestrator;
mod registry;
mod selection;
mod ui;
mod util;

// Re-export main types
pub use activation::registrar::{Registration, RegistrarPaths};
pub use activation::ActivationError;
pub use catalog::{Component, ComponentKind, CATALOG, LANGUAGE_SERVERS, REQUIRED_EXTENSIONS};
pub use config::Config;
pub use engine::{CliEngine, ContainerEngine};
pub use orchestrator::{
    Event, OrchestrateError, Orchestrator, Outcome, Phase, Prompt, RunOptions, RunReport,
    RunStatus,
};
pub use registry::{WrapperRegistration, WrapperRegistry};
pub use selection::{LanguageServers, Selection, SelectionError};
