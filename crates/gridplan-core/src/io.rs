//! JSON round-trip for instance and solution documents.
//!
//! Only the fields the evaluator reads are (de)serialized. Everything read
//! is validated before it is returned: instances through [`Instance::new`],
//! solutions through [`Solution::validate`] against the instance they
//! belong to. The instance is always a required argument when reading a
//! solution.

use std::fs;
use std::path::Path;

use crate::error::GridResult;
use crate::instance::{Instance, InstanceDocument};
use crate::solution::Solution;

/// Parse and validate an instance from JSON text.
pub fn instance_from_str(text: &str) -> GridResult<Instance> {
    let doc: InstanceDocument = serde_json::from_str(text)?;
    Instance::try_from(doc)
}

/// Read and validate an instance file.
pub fn read_instance(path: impl AsRef<Path>) -> GridResult<Instance> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let instance = instance_from_str(&text)?;
    tracing::debug!(
        path = %path.display(),
        sites = instance.sites().len(),
        links = instance.links().len(),
        "read instance"
    );
    Ok(instance)
}

pub fn instance_to_string(instance: &Instance) -> GridResult<String> {
    Ok(serde_json::to_string_pretty(&instance.to_document())?)
}

pub fn write_instance(path: impl AsRef<Path>, instance: &Instance) -> GridResult<()> {
    fs::write(path, instance_to_string(instance)?)?;
    Ok(())
}

/// Parse a solution from JSON text and validate it against `instance`.
pub fn solution_from_str(text: &str, instance: &Instance) -> GridResult<Solution> {
    let solution: Solution = serde_json::from_str(text)?;
    solution.validate(instance)?;
    Ok(solution)
}

/// Read a solution file and validate it against `instance`.
pub fn read_solution(path: impl AsRef<Path>, instance: &Instance) -> GridResult<Solution> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let solution = solution_from_str(&text, instance)?;
    tracing::debug!(
        path = %path.display(),
        activated_sites = solution.activated_sites.len(),
        used_links = solution.used_links.len(),
        "read solution"
    );
    Ok(solution)
}

pub fn solution_to_string(solution: &Solution) -> GridResult<String> {
    Ok(serde_json::to_string_pretty(solution)?)
}

pub fn write_solution(path: impl AsRef<Path>, solution: &Solution) -> GridResult<()> {
    fs::write(path, solution_to_string(solution)?)?;
    Ok(())
}
