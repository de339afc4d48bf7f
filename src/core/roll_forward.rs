//! Materializes due occurrences of recurring rules.
//!
//! A pass walks every rule from its cursor up to and including `today`, emitting one
//! transaction per period in chronological order and leaving the cursor on the first
//! occurrence after `today`. Running a second pass with the same `today` emits
//! nothing because every cursor is already past it.

use chrono::NaiveDate;

use crate::ledger::{RecurringRule, Transaction};

/// What a single pass did to one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub emitted: usize,
    pub cursor_before: Option<NaiveDate>,
    pub cursor_after: Option<NaiveDate>,
}

impl RuleOutcome {
    pub fn cursor_moved(&self) -> bool {
        self.cursor_before != self.cursor_after
    }
}

/// A rule whose cursor could not be advanced. Its cursor is left where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub rule_id: String,
    pub frequency: String,
    pub cursor: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct RollForwardReport {
    /// Newly due transactions, grouped per rule in rule order, each group chronological.
    pub generated: Vec<Transaction>,
    pub outcomes: Vec<RuleOutcome>,
    pub failures: Vec<RuleFailure>,
}

impl RollForwardReport {
    pub fn cursors_changed(&self) -> bool {
        self.outcomes.iter().any(RuleOutcome::cursor_moved)
    }

    pub fn is_noop(&self) -> bool {
        self.generated.is_empty() && !self.cursors_changed()
    }
}

/// Runs one pass over `rules`, mutating their cursors in place.
pub fn roll_forward(rules: &mut [RecurringRule], today: NaiveDate) -> RollForwardReport {
    let mut report = RollForwardReport::default();
    for rule in rules.iter_mut() {
        let cursor_before = rule.next_due_date;
        let result = roll_rule(rule, today, &mut report.generated);
        let emitted = match result {
            Ok(emitted) => emitted,
            Err((emitted, failure)) => {
                tracing::error!(
                    rule = %failure.rule_id,
                    frequency = %failure.frequency,
                    cursor = %failure.cursor,
                    "cannot compute next due date; rule skipped"
                );
                report.failures.push(failure);
                emitted
            }
        };
        report.outcomes.push(RuleOutcome {
            rule_id: rule.id.clone(),
            emitted,
            cursor_before,
            cursor_after: rule.next_due_date,
        });
    }
    tracing::info!(
        %today,
        rules = rules.len(),
        generated = report.generated.len(),
        failures = report.failures.len(),
        "roll-forward pass complete"
    );
    report
}

/// Advances a single rule to the first occurrence after `today`.
///
/// An occurrence is emitted only once the following date is known, so a rule that
/// cannot advance never emits the same occurrence twice across passes. Emitting
/// before advancing would repeat the stuck occurrence on every start.
fn roll_rule(
    rule: &mut RecurringRule,
    today: NaiveDate,
    generated: &mut Vec<Transaction>,
) -> Result<usize, (usize, RuleFailure)> {
    let mut cursor = rule.cursor();
    rule.next_due_date = Some(cursor);
    let mut emitted = 0usize;

    while cursor <= today {
        let Some(next) = rule.frequency.advance(cursor) else {
            return Err((
                emitted,
                RuleFailure {
                    rule_id: rule.id.clone(),
                    frequency: rule.frequency.to_string(),
                    cursor,
                },
            ));
        };
        // Cursors recorded before the start date are walked forward silently.
        if cursor >= rule.start_date {
            tracing::debug!(rule = %rule.id, date = %cursor, "materializing occurrence");
            generated.push(rule.occurrence(cursor));
            emitted += 1;
        }
        cursor = next;
        rule.next_due_date = Some(cursor);
    }

    Ok(emitted)
}
