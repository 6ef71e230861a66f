use chrono::{DateTime, Utc};

use crate::app::{BattleComboDetail, ComboDetail, GoalDetail, MoveDetail, TagSummary};
use crate::entities::{dance_move, goal_stage, tag};

const PROGRESS_WIDTH: usize = 20;

fn has_text(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_tag_names(tags: &[tag::Model]) -> String {
    if tags.is_empty() {
        return "(none)".to_string();
    }
    tags.iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_move_sequence(moves: &[dance_move::Model]) -> String {
    moves
        .iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub fn format_move_line(detail: &MoveDetail) -> String {
    if detail.tags.is_empty() {
        return format!("{} {}", detail.dance_move.id, detail.dance_move.name);
    }
    format!(
        "{} {} [{}]",
        detail.dance_move.id,
        detail.dance_move.name,
        format_tag_names(&detail.tags)
    )
}

pub fn format_move_detail(detail: &MoveDetail) -> String {
    let mut output = String::new();
    output.push_str(&format!("Move ID: {}\n", detail.dance_move.id));
    output.push_str(&format!("Name: {}\n", detail.dance_move.name));
    output.push_str(&format!("Tags: {}\n", format_tag_names(&detail.tags)));
    output.push_str(&format!(
        "Created: {}\n",
        format_datetime(detail.dance_move.created_at)
    ));
    output.push_str(&format!(
        "Updated: {}\n",
        format_datetime(detail.dance_move.updated_at)
    ));
    output.trim_end().to_string()
}

pub fn format_tag_line(summary: &TagSummary) -> String {
    let noun = if summary.move_count == 1 { "move" } else { "moves" };
    format!(
        "{} {} ({} {})",
        summary.tag.id, summary.tag.name, summary.move_count, noun
    )
}

pub fn format_combo_line(detail: &ComboDetail) -> String {
    format!(
        "{} {} [{}, {}] {}",
        detail.combo.id,
        detail.combo.name,
        detail.combo.energy,
        detail.combo.status,
        format_move_sequence(&detail.moves)
    )
}

pub fn format_combo_detail(detail: &ComboDetail) -> String {
    let combo = &detail.combo;
    let mut output = String::new();
    output.push_str(&format!("Combo ID: {}\n", combo.id));
    output.push_str(&format!("Name: {}\n", combo.name));
    if has_text(&combo.description) {
        output.push_str(&format!(
            "Description: {}\n",
            combo.description.as_deref().unwrap_or("")
        ));
    }
    output.push_str(&format!("Energy: {}\n", combo.energy));
    output.push_str(&format!("Status: {}\n", combo.status));
    output.push_str(&format!("Tags: {}\n", format_tag_names(&detail.tags)));
    output.push_str(&format!("Created: {}\n", format_datetime(combo.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(combo.updated_at)));
    output.push('\n');
    if detail.moves.is_empty() {
        output.push_str("Moves: (none)");
        return output;
    }
    output.push_str("Moves:\n");
    for (idx, item) in detail.moves.iter().enumerate() {
        output.push_str(&format!("{}. {} (move id {})\n", idx + 1, item.name, item.id));
    }
    output.trim_end().to_string()
}

pub fn format_battle_line(detail: &BattleComboDetail) -> String {
    let marker = if detail.combo.used { "x" } else { " " };
    format!(
        "[{}] {} {} [{}, {}] {}",
        marker,
        detail.combo.id,
        detail.combo.description,
        detail.combo.energy,
        detail.combo.status,
        detail.moves.join(" -> ")
    )
}

pub fn format_battle_detail(detail: &BattleComboDetail) -> String {
    let combo = &detail.combo;
    let mut output = String::new();
    output.push_str(&format!("Battle Combo ID: {}\n", combo.id));
    output.push_str(&format!("Description: {}\n", combo.description));
    output.push_str(&format!("Energy: {}\n", combo.energy));
    output.push_str(&format!("Status: {}\n", combo.status));
    output.push_str(&format!("Used: {}\n", if combo.used { "yes" } else { "no" }));
    output.push('\n');
    if detail.moves.is_empty() {
        output.push_str("Moves: (none)");
        return output;
    }
    output.push_str("Moves:\n");
    for (idx, name) in detail.moves.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", idx + 1, name));
    }
    output.trim_end().to_string()
}

pub fn format_progress_bar(current: i64, target: i64) -> String {
    let filled = if target <= 0 {
        0
    } else {
        let clamped = current.clamp(0, target) as usize;
        clamped * PROGRESS_WIDTH / target as usize
    };
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}

pub fn format_stage_line(stage: &goal_stage::Model) -> String {
    let marker = if stage.current_count >= stage.target_count {
        "x"
    } else {
        " "
    };
    format!(
        "- [{}] {} {}/{} {} (stage id {})",
        marker, stage.name, stage.current_count, stage.target_count, stage.unit, stage.id
    )
}

pub fn format_goal_line(detail: &GoalDetail) -> String {
    let archived = if detail.goal.archived { " (archived)" } else { "" };
    format!(
        "{} {} {} {}%{}",
        detail.goal.id,
        detail.goal.title,
        {
            let (current, target) = detail.progress();
            format_progress_bar(current, target)
        },
        detail.percent(),
        archived
    )
}

pub fn format_goal_detail(detail: &GoalDetail) -> String {
    let goal = &detail.goal;
    let (current, target) = detail.progress();
    let mut output = String::new();
    output.push_str(&format!("Goal ID: {}\n", goal.id));
    output.push_str(&format!("Title: {}\n", goal.title));
    if has_text(&goal.description) {
        output.push_str(&format!(
            "Description: {}\n",
            goal.description.as_deref().unwrap_or("")
        ));
    }
    output.push_str(&format!(
        "Archived: {}\n",
        if goal.archived { "yes" } else { "no" }
    ));
    output.push_str(&format!(
        "Progress: {} {}%{}\n",
        format_progress_bar(current, target),
        detail.percent(),
        if detail.is_complete() { " complete" } else { "" }
    ));
    output.push_str(&format!("Created: {}\n", format_datetime(goal.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(goal.updated_at)));
    output.push('\n');
    if detail.stages.is_empty() {
        output.push_str("Stages: (none)");
        return output;
    }
    output.push_str("Stages:\n");
    for stage in &detail.stages {
        output.push_str(&format_stage_line(stage));
        output.push('\n');
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{battle_combo, goal};

    fn stage(current: i32, target: i32) -> goal_stage::Model {
        goal_stage::Model {
            id: 4,
            goal_id: 1,
            name: "Circles".to_string(),
            target_count: target,
            current_count: current,
            unit: "reps".to_string(),
            sort_order: 1,
        }
    }

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(format_progress_bar(0, 10), format!("[{}]", "-".repeat(20)));
        assert_eq!(
            format_progress_bar(5, 10),
            format!("[{}{}]", "#".repeat(10), "-".repeat(10))
        );
        assert_eq!(format_progress_bar(15, 10), format!("[{}]", "#".repeat(20)));
        assert_eq!(format_progress_bar(3, 0), format!("[{}]", "-".repeat(20)));
    }

    #[test]
    fn stage_line_marks_completion() {
        assert_eq!(
            format_stage_line(&stage(20, 20)),
            "- [x] Circles 20/20 reps (stage id 4)"
        );
        assert_eq!(
            format_stage_line(&stage(3, 20)),
            "- [ ] Circles 3/20 reps (stage id 4)"
        );
    }

    #[test]
    fn goal_detail_lists_stages() {
        let now = Utc::now();
        let detail = GoalDetail {
            goal: goal::Model {
                id: 1,
                title: "Flare".to_string(),
                description: Some("  ".to_string()),
                archived: false,
                created_at: now,
                updated_at: now,
            },
            stages: vec![stage(10, 20)],
        };
        let text = format_goal_detail(&detail);
        assert!(text.contains("Title: Flare\n"));
        assert!(!text.contains("Description"));
        assert!(text.contains("50%"));
        assert!(text.ends_with("- [ ] Circles 10/20 reps (stage id 4)"));
    }

    #[test]
    fn battle_line_shows_used_marker() {
        let now = Utc::now();
        let detail = BattleComboDetail {
            combo: battle_combo::Model {
                id: 2,
                description: "Closer".to_string(),
                energy: "high".to_string(),
                status: "ready".to_string(),
                used: true,
                created_at: now,
                updated_at: now,
            },
            moves: vec!["Flare".to_string(), "Freeze".to_string()],
        };
        assert_eq!(
            format_battle_line(&detail),
            "[x] 2 Closer [high, ready] Flare -> Freeze"
        );
    }
}
