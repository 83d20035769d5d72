//! Output rendering for bridgectl.
//!
//! Formats workflow and step information for terminal display.

use bridge_core::{Workflow, WorkflowStep};

use crate::client::WorkflowSummary;

/// Print confirmation after submitting a migration.
pub fn print_workflow_created(workflow: &Workflow) {
    println!("Created workflow: {}", workflow.id);
    println!("  Type:   {}", workflow.workflow_type);
    println!("  State:  {}", workflow.state.as_str());
    println!(
        "  Source: {}",
        workflow.input["sourceSystem"].as_str().unwrap_or("-")
    );
    println!(
        "  Target: {}",
        workflow.input["targetSystem"].as_str().unwrap_or("-")
    );
}

/// Print a list of workflows in tabular format.
pub fn print_workflow_list(workflows: &[WorkflowSummary]) {
    if workflows.is_empty() {
        println!("No workflows found.");
        return;
    }

    println!(
        "{:<36}  {:<12}  {:<10}  {:<20}",
        "ID", "TYPE", "STATE", "CREATED"
    );
    println!("{}", "-".repeat(84));

    for workflow in workflows {
        println!(
            "{:<36}  {:<12}  {:<10}  {:<20}",
            workflow.id,
            workflow.workflow_type,
            workflow.state,
            format_time(&workflow.created_at),
        );
    }

    println!();
    println!("{} workflow(s)", workflows.len());
}

/// Print detailed information about a workflow and its steps.
pub fn print_workflow_details(workflow: &Workflow) {
    println!("Workflow: {}", workflow.id);
    println!();
    println!("  Type:      {}", workflow.workflow_type);
    println!("  State:     {}", workflow.state.as_str());
    println!("  Created:   {}", format_time(&workflow.created_at));
    if let Some(started) = workflow.started_at {
        println!("  Started:   {}", format_time(&started));
    }
    if let Some(completed) = workflow.completed_at {
        println!("  Completed: {}", format_time(&completed));
    }
    if let Some(error) = &workflow.error {
        println!("  Error:     {error}");
    }

    if !workflow.steps.is_empty() {
        println!();
        println!("  Steps:");
        println!(
            "    {:<8}  {:<28}  {:<10}  {:<9}",
            "ID", "NAME", "STATUS", "DURATION"
        );
        println!("    {}", "-".repeat(62));
        for step in &workflow.steps {
            println!(
                "    {:<8}  {:<28}  {:<10}  {:<9}",
                step.id,
                truncate(&step.name, 28),
                step.status.as_str(),
                format_duration(step),
            );
        }
    }

    if let Some(result) = &workflow.result {
        println!();
        println!("  Result:");
        println!("    Migrated: {}", result["migratedCount"]);
        println!("    Success:  {}", result["success"]);
    }
}

fn format_duration(step: &WorkflowStep) -> String {
    match (step.start_time, step.end_time) {
        (Some(start), Some(end)) => format!("{}ms", (end - start).num_milliseconds()),
        (Some(_), None) => "running".to_string(),
        _ => "-".to_string(),
    }
}

fn format_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
