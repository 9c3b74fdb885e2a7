//! LLM-facing agents: planning, file generation, document ingestion and
//! question answering.

pub mod advisor;
pub mod analyst;
pub mod generator;
pub mod planner;
