//! Markdown rendering of a learned table as stand/hit charts.

use crate::engine::Action;
use crate::table::{StateKey, ValueTable};

const DEALER_CARDS: [&str; 10] = ["2", "3", "4", "5", "6", "7", "8", "9", "10", "A"];

/// Chart symbol for one state: `S`/`H`, `=` for an exact tie, `-` if unseen.
pub fn cell_symbol(table: &ValueTable, key: &StateKey) -> &'static str {
    match table.get(key) {
        None => "-",
        Some(values) => values.preferred().map_or("=", |action| action.symbol()),
    }
}

fn table_header(output: &mut String, title: &str) {
    output.push_str(&format!("## {}\n\n", title));
    output.push_str("| Hand | ");
    output.push_str(&DEALER_CARDS.join(" | "));
    output.push_str(" |\n");
    output.push_str("|------|");
    output.push_str(&["---"; 10].join("|"));
    output.push_str("|\n");
}

fn table_row(output: &mut String, table: &ValueTable, label: &str, total: u8, is_soft: bool) {
    output.push_str(&format!("| **{}** |", label));
    for dealer in 2..=11 {
        let key = StateKey::new(total, is_soft, dealer);
        output.push_str(&format!(" {} |", cell_symbol(table, &key)));
    }
    output.push('\n');
}

/// Render hard (4-20) and soft (12-20) totals against every dealer up-card.
pub fn format_tables(table: &ValueTable) -> String {
    let mut output = String::new();

    table_header(&mut output, "Hard Totals");
    for total in (4..=20).rev() {
        table_row(&mut output, table, &total.to_string(), total, false);
    }
    output.push('\n');

    table_header(&mut output, "Soft Totals");
    for total in (12..=20).rev() {
        let label = if total == 12 {
            "A,A".to_string()
        } else {
            format!("A,{}", total - 11)
        };
        table_row(&mut output, table, &label, total, true);
    }
    output.push('\n');

    output.push_str("## Legend\n\n");
    output.push_str("- **S** = Stand\n");
    output.push_str("- **H** = Hit\n");
    output.push_str("- **=** = Estimates tied\n");
    output.push_str("- **-** = Not visited\n\n");
    output.push_str("### Rules Used\n\n");
    output.push_str("- Dealer hits soft 17 (H17)\n");
    output.push_str("- Reshuffle below 20 cards\n");
    output.push_str("- Even money, no doubling, splitting or surrender\n");

    output
}

/// A state whose two estimates are nearly equal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseDecision {
    pub key: StateKey,
    pub best: Action,
    pub best_value: f64,
    pub other_value: f64,
    pub gap: f64,
}

/// States with |Q(stand) − Q(draw)| below `threshold`, smallest gap first.
/// States that have never been updated away from zero are skipped.
pub fn close_decisions(table: &ValueTable, threshold: f64) -> Vec<CloseDecision> {
    let mut decisions: Vec<CloseDecision> = table
        .iter()
        .filter(|(_, values)| values.gap() < threshold && **values != Default::default())
        .map(|(&key, values)| {
            let best = values.preferred().unwrap_or(Action::Stand);
            let other = if best == Action::Stand { Action::Draw } else { Action::Stand };
            CloseDecision {
                key,
                best,
                best_value: values.get(best),
                other_value: values.get(other),
                gap: values.gap(),
            }
        })
        .collect();

    decisions.sort_by(|a, b| a.gap.total_cmp(&b.gap).then(a.key.cmp(&b.key)));
    decisions
}

/// Plain-text listing of [`close_decisions`], at most `limit` rows.
pub fn format_close_decisions(decisions: &[CloseDecision], limit: usize) -> String {
    let mut output = format!(
        "{:<20} {:>6} {:>10} {:>10} {:>10}\n",
        "State", "Best", "Q(best)", "Q(other)", "Gap"
    );
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for decision in decisions.iter().take(limit) {
        output.push_str(&format!(
            "{:<20} {:>6} {:>+10.4} {:>+10.4} {:>10.4}\n",
            decision.key.to_string(),
            decision.best.symbol(),
            decision.best_value,
            decision.other_value,
            decision.gap
        ));
    }
    output
}

/// States where two tables recommend different actions.
pub fn disagreements(a: &ValueTable, b: &ValueTable) -> Vec<StateKey> {
    let mut keys: Vec<StateKey> = a
        .iter()
        .filter_map(|(key, values)| {
            let other = b.get(key)?;
            match (values.preferred(), other.preferred()) {
                (Some(x), Some(y)) if x != y => Some(*key),
                _ => None,
            }
        })
        .collect();
    keys.sort();
    keys
}
