//! Budget-bounded prompt context assembly.

use crate::error::CoreError;
use crate::persona::PersonaConfig;
use crate::task::GenerationTask;
use log::{debug, warn};
use maistro_rs_memory::Record;
use maistro_rs_protocol::{BlockRole, ContextBudget, PromptBlock, PromptContext};
use std::borrow::Borrow;

/// Metadata keys rendered in a record block header, in order.
const HEADER_KEYS: &[&str] = &["genre", "date", "bpm", "key", "themes", "source"];

/// Composes persona, task instructions and records into a `PromptContext`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextAssembler {
    task: Option<GenerationTask>,
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a non-truncatable task instruction block after the persona.
    pub fn with_task(task: GenerationTask) -> Self {
        Self { task: Some(task) }
    }

    pub fn task(&self) -> Option<GenerationTask> {
        self.task
    }

    /// Build a context within `budget`.
    ///
    /// Every block is charged its rendered size, heading and separator
    /// included, so `render()` never exceeds the budget. Persona and task
    /// blocks are always included. Records are appended whole in the given
    /// order until the first one that would overflow; it and every later
    /// record count as dropped.
    pub fn assemble<I>(
        &self,
        persona: &PersonaConfig,
        records: I,
        budget: ContextBudget,
    ) -> Result<PromptContext, CoreError>
    where
        I: IntoIterator,
        I::Item: Borrow<Record>,
    {
        let mut blocks = vec![persona_block(persona)];
        let mut required = blocks[0].cost(budget.unit);
        if let Some(task) = self.task {
            let block = PromptBlock::new(
                BlockRole::Task,
                format!("Task: {task}"),
                task.render(persona),
            );
            required += block.joined_cost(budget.unit);
            blocks.push(block);
        }
        if required > budget.limit {
            return Err(CoreError::BudgetExceeded {
                required,
                budget: budget.limit,
            });
        }

        let mut used = required;
        let mut dropped = 0usize;
        let mut records = records.into_iter();
        for record in records.by_ref() {
            let block = record_block(record.borrow());
            let cost = block.joined_cost(budget.unit);
            if used + cost > budget.limit {
                dropped = 1;
                break;
            }
            used += cost;
            blocks.push(block);
        }
        dropped += records.count();

        if dropped > 0 && used == required {
            warn!(
                "context budget leaves no room for records (budget={}, persona_cost={}, dropped={})",
                budget.limit, required, dropped
            );
        }
        debug!(
            "assembled context (blocks={}, used={}, budget={}, dropped={})",
            blocks.len(),
            used,
            budget.limit,
            dropped
        );
        Ok(PromptContext {
            blocks,
            budget,
            used,
            dropped,
        })
    }
}

/// Render the persona as the leading block.
pub fn persona_block(persona: &PersonaConfig) -> PromptBlock {
    PromptBlock::new(BlockRole::Persona, "Persona", persona.render())
}

/// Render one record as a labeled block.
pub fn record_block(record: &Record) -> PromptBlock {
    let title = record.title().unwrap_or(record.id.as_str());
    let header = HEADER_KEYS
        .iter()
        .filter_map(|key| {
            record
                .meta(key)
                .map(|value| value.to_string())
                .filter(|value| !value.trim().is_empty())
                .map(|value| format!("{key}: {value}"))
        })
        .collect::<Vec<_>>();
    let text = if header.is_empty() {
        record.body.clone()
    } else {
        format!("{}\n\n{}", header.join(" | "), record.body)
    };
    PromptBlock::new(BlockRole::Record, format!("{}/{title}", record.kind), text)
}
