#![allow(dead_code)]

use chrono::NaiveDate;
use jira_bulk::backend::MemoryTracker;
use jira_bulk::config::RunOptions;
use jira_bulk::model::{Priority, Ticket, Transition};

/// Fixed run date so due-date assertions are deterministic.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 12).unwrap()
}

pub fn options() -> RunOptions {
    RunOptions::new(today())
}

pub fn ticket(key: &str) -> Ticket {
    Ticket {
        key: key.to_string(),
        status: "To Do".to_string(),
        priority: Priority::Medium,
        labels: vec![],
        due_date: None,
        created: NaiveDate::from_ymd_opt(2025, 1, 1),
    }
}

pub fn ticket_with_priority(key: &str, priority: Priority) -> Ticket {
    Ticket {
        priority,
        ..ticket(key)
    }
}

/// `count` tickets `PRJ-1..=PRJ-count` in project `PRJ`.
pub fn project_with_tickets(count: usize) -> MemoryTracker {
    MemoryTracker::new()
        .with_project("PRJ", "Project")
        .with_tickets((1..=count).map(|n| ticket(&format!("PRJ-{n}"))))
}

pub fn workflow() -> Vec<Transition> {
    vec![
        Transition::new("11", "To Do"),
        Transition::new("21", "In Progress"),
        Transition::new("31", "Done"),
    ]
}
