//! Generic turn protocol for scripts that need no domain-specific setup
//!
//! Mirrors the fact list after every turn and finishes as soon as a turn
//! leaves the agenda empty.

use crate::engine::Engine;
use crate::runtime::{DomainError, TurnProtocol};
use serde::Serialize;

/// Summary produced by `dispose`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub turns: u64,
    pub final_facts: String,
}

#[derive(Debug, Default)]
pub struct QuiescenceDomain {
    facts: String,
    turns: u64,
    done: bool,
    report: Option<RunReport>,
}

impl QuiescenceDomain {
    /// Fact list as of the last completed turn
    pub fn facts(&self) -> &str {
        &self.facts
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    fn refresh(&mut self, engine: &mut dyn Engine) -> Result<(), DomainError> {
        self.facts = engine.fact_list_text()?;
        self.done = agenda_is_empty(&engine.agenda_text()?);
        Ok(())
    }
}

impl TurnProtocol for QuiescenceDomain {
    fn setup(&mut self, engine: &mut dyn Engine) -> Result<(), DomainError> {
        self.turns = 0;
        self.report = None;
        self.refresh(engine)
    }

    fn action(&mut self, engine: &mut dyn Engine) -> Result<(), DomainError> {
        self.turns += 1;
        self.refresh(engine)
    }

    fn has_done(&self) -> bool {
        self.done
    }

    fn dispose(&mut self, _engine: &mut dyn Engine) -> Result<(), DomainError> {
        tracing::info!(turns = self.turns, "Agenda drained");
        self.report = Some(RunReport {
            turns: self.turns,
            final_facts: self.facts.clone(),
        });
        Ok(())
    }
}

/// True when the rendering lists no activations, only the optional summary line
fn agenda_is_empty(agenda: &str) -> bool {
    agenda
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .all(|l| l.starts_with("For a total of"))
}
