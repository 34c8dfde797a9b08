//! Prompt payload types handed to external generators.

use serde::{Deserialize, Serialize};

/// Separator placed between rendered blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Unit used to measure prompt size against a budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetUnit {
    /// Unicode scalar values.
    #[default]
    Chars,
    /// Approximate tokens, four characters per token rounded up.
    Tokens,
}

impl BudgetUnit {
    /// Measure the size of `text` in this unit.
    pub fn measure(self, text: &str) -> usize {
        let chars = text.chars().count();
        match self {
            BudgetUnit::Chars => chars,
            BudgetUnit::Tokens => chars.div_ceil(4),
        }
    }
}

/// Declared maximum size of a prompt context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextBudget {
    /// Maximum number of units.
    pub limit: usize,
    /// Unit the limit is expressed in.
    pub unit: BudgetUnit,
}

impl ContextBudget {
    /// Budget measured in characters.
    pub fn chars(limit: usize) -> Self {
        Self {
            limit,
            unit: BudgetUnit::Chars,
        }
    }

    /// Budget measured in approximate tokens.
    pub fn tokens(limit: usize) -> Self {
        Self {
            limit,
            unit: BudgetUnit::Tokens,
        }
    }
}

/// Origin of a prompt block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockRole {
    /// Persona voice and constraint rules.
    Persona,
    /// Task-specific instructions.
    Task,
    /// A retrieved creative record.
    Record,
}

/// Labeled text block inside a prompt context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptBlock {
    /// Block origin.
    pub role: BlockRole,
    /// Human readable label rendered as the block heading.
    pub label: String,
    /// Block text.
    pub text: String,
}

impl PromptBlock {
    pub fn new(role: BlockRole, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role,
            label: label.into(),
            text: text.into(),
        }
    }

    /// Block as it appears in a rendered prompt: heading, blank line, text.
    pub fn render(&self) -> String {
        format!("## {}\n\n{}", self.label, self.text)
    }

    /// Size of the rendered block in the given unit.
    pub fn cost(&self, unit: BudgetUnit) -> usize {
        unit.measure(&self.render())
    }

    /// Size of the block when it follows another one, separator included.
    pub fn joined_cost(&self, unit: BudgetUnit) -> usize {
        unit.measure(BLOCK_SEPARATOR) + self.cost(unit)
    }
}

/// Ordered, budget-bounded payload for a generator call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptContext {
    /// Blocks in prompt order: persona, task, then records.
    pub blocks: Vec<PromptBlock>,
    /// Budget the context was assembled against.
    pub budget: ContextBudget,
    /// Units charged for the rendered blocks and their separators.
    pub used: usize,
    /// Number of candidate records left out because of the budget.
    pub dropped: usize,
}

impl PromptContext {
    /// Whether any candidate record was dropped to respect the budget.
    pub fn truncated(&self) -> bool {
        self.dropped > 0
    }

    /// Units still available.
    pub fn remaining(&self) -> usize {
        self.budget.limit.saturating_sub(self.used)
    }

    /// Blocks that carry retrieved records.
    pub fn record_blocks(&self) -> impl Iterator<Item = &PromptBlock> {
        self.blocks
            .iter()
            .filter(|block| block.role == BlockRole::Record)
    }

    /// Render the blocks as a single prompt string.
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(PromptBlock::render)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    /// Size of [`render`](Self::render) in the budget's unit.
    pub fn rendered_cost(&self) -> usize {
        self.budget.unit.measure(&self.render())
    }
}
