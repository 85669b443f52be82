//! Dispatch waves for an executor.
//!
//! Dependencies come from the `parallel` flags alone:
//! - a parallel step depends on nothing
//! - a serial step depends on every earlier serial step
//! - the terminal `risk_score` step depends on every other step
//!
//! Waves are computed with Kahn's algorithm, one frontier at a time. Within a
//! wave, steps keep their plan order.

use super::validate_plan;
use crate::core::types::Step;
use crate::core::PlanningError;

/// Indices of the steps `plan[index]` must wait for.
fn dependencies(plan: &[Step], index: usize) -> Vec<usize> {
    let step = &plan[index];
    if step.is_terminal() {
        return (0..index).collect();
    }
    if step.parallel {
        return Vec::new();
    }
    (0..index).filter(|&i| !plan[i].parallel).collect()
}

/// Group step ids into waves that may be dispatched concurrently.
pub fn waves(plan: &[Step]) -> Result<Vec<Vec<String>>, PlanningError> {
    validate_plan(plan)?;

    let mut in_degree = vec![0usize; plan.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); plan.len()];
    for (i, degree) in in_degree.iter_mut().enumerate() {
        for dep in dependencies(plan, i) {
            adjacency[dep].push(i);
            *degree += 1;
        }
    }

    let mut frontier: Vec<usize> = (0..plan.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut result = Vec::new();
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for &current in &frontier {
            for &neighbor in &adjacency[current] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    next.push(neighbor);
                }
            }
        }
        next.sort_unstable();
        result.push(frontier.iter().map(|&i| plan[i].id.clone()).collect());
        frontier = next;
    }
    Ok(result)
}
