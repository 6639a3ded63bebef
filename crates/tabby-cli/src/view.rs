//! Terminal rendering: the ASCII grid, the tree outline and the status line.
//!
//! Layout is computed by plain functions returning strings so it can be
//! tested without a terminal; colour is applied at print time.

use colored::Colorize;
use tabby_runtime::{BehaviorNode, Snapshot};
use tabby_types::{AgentState, GridBounds, Position};

/// ANSI sequence that clears the screen and homes the cursor.
pub const CLEAR: &str = "\x1b[2J\x1b[H";

/// The grid as text rows, border included, with `glyph` at `cat`.
pub fn grid_rows(cat: Position, bounds: GridBounds, glyph: char) -> Vec<String> {
    let width = bounds.width.max(0) as usize;
    let border = format!("+{}+", "-".repeat(width));
    let mut rows = Vec::with_capacity(bounds.height.max(0) as usize + 2);
    rows.push(border.clone());
    for y in 0..bounds.height {
        let row: String = (0..bounds.width)
            .map(|x| if x == cat.x && y == cat.y { glyph } else { ' ' })
            .collect();
        rows.push(format!("|{row}|"));
    }
    rows.push(border);
    rows
}

/// One line of the tree outline.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub depth: usize,
    pub label: String,
    /// On the path the next tick will resume.
    pub active: bool,
}

/// Depth-first outline of `root`.
pub fn tree_rows(root: &BehaviorNode) -> Vec<TreeRow> {
    let path = root.active_path();
    let mut rows = Vec::new();
    collect_rows(root, 0, &path, &mut rows);
    rows
}

fn collect_rows(node: &BehaviorNode, depth: usize, path: &[&BehaviorNode], out: &mut Vec<TreeRow>) {
    let mut label = format!("{} \"{}\" [{}]", node.kind_tag(), node.name(), node.status());
    if let Some(p) = node.param() {
        label.push_str(&format!(" ({p:.1})"));
    }
    out.push(TreeRow {
        depth,
        label,
        active: path.iter().any(|p| std::ptr::eq(*p, node)),
    });
    for child in node.children() {
        collect_rows(child, depth + 1, path, out);
    }
}

pub fn status_line(snap: &Snapshot) -> String {
    format!(
        "tick {:>6}  pos ({:>2},{:>2})  {:<15} {}",
        snap.tick,
        snap.position.x,
        snap.position.y,
        snap.state.as_str(),
        snap.active_node.as_deref().unwrap_or("-"),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Printing
// ─────────────────────────────────────────────────────────────────────────────

fn paint(state: AgentState) -> String {
    let (r, g, b) = state.rgb();
    state.glyph().to_string().truecolor(r, g, b).bold().to_string()
}

/// Print the grid with the cat drawn in its state colour.
pub fn print_frame(snap: &Snapshot, bounds: GridBounds) {
    let glyph = snap.state.glyph();
    let painted = paint(snap.state);
    for (i, row) in grid_rows(snap.position, bounds, glyph).iter().enumerate() {
        if i as i32 == snap.position.y + 1 {
            // Border column shifts the cat one cell right.
            let split = snap.position.x as usize + 1;
            let (head, tail) = row.split_at(split);
            println!("{}{}{}", head.dimmed(), painted, tail[glyph.len_utf8()..].dimmed());
        } else {
            println!("{}", row.dimmed());
        }
    }
    println!("{}", status_line(snap));
}

pub fn print_tree(root: &BehaviorNode) {
    for row in tree_rows(root) {
        let indent = "  ".repeat(row.depth);
        if row.active {
            println!("{}{} {}", indent, "▶".green(), row.label.bold().green());
        } else {
            println!("{}  {}", indent, row.label);
        }
    }
}

pub fn print_snapshot(snap: &Snapshot) {
    println!("{}", "Cat Status".bold().underline());
    println!("  Tick        : {}", snap.tick.to_string().yellow());
    println!("  Position    : ({}, {})", snap.position.x, snap.position.y);
    println!("  State       : {} {}", paint(snap.state), snap.state.as_str().bold());
    println!("  Tree status : {}", snap.status);
    println!("  Active node : {}", snap.active_node.as_deref().unwrap_or("-").cyan());
    println!("  Weights     :");
    for (tag, weight) in snap.weights.ranked() {
        println!("    {:<9} {:.2}", tag.as_str(), weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabby_runtime::{Cat, CatConfig, Simulation};
    use tabby_types::NodeStatus;

    #[test]
    fn grid_has_borders_and_one_cat() {
        let rows = grid_rows(Position::new(2, 1), GridBounds::new(5, 3), 'z');
        assert_eq!(
            rows,
            vec!["+-----+", "|     |", "|  z  |", "|     |", "+-----+"]
        );
    }

    #[test]
    fn grid_corners_are_drawable() {
        let bounds = GridBounds::new(4, 2);
        let rows = grid_rows(Position::new(3, 1), bounds, '@');
        assert_eq!(rows[2], "|   @|");
        let rows = grid_rows(Position::new(0, 0), bounds, '@');
        assert_eq!(rows[1], "|@   |");
    }

    #[test]
    fn tree_outline_marks_the_active_path() {
        let cat = Cat::new(CatConfig { seed: Some(2), ..CatConfig::default() });
        let rows = tree_rows(cat.root());
        assert_eq!(rows.len(), cat.root().node_count());
        assert_eq!(rows[0].depth, 0);
        assert!(rows[0].label.starts_with("Sequence"));

        // Fresh tree: the path runs root -> observe_items.
        let active: Vec<_> = rows.iter().filter(|r| r.active).collect();
        assert_eq!(active.len(), 2);
        assert!(active[1].label.starts_with("ObserveItems"));
        assert!(active[1].label.contains(&format!("[{}]", NodeStatus::Running)));
    }

    #[test]
    fn status_line_names_state_and_leaf() {
        let mut sim = Simulation::new(CatConfig { seed: Some(5), ..CatConfig::default() });
        sim.tick();
        let line = status_line(&sim.snapshot());
        assert!(line.contains("tick      1"));
        assert!(line.contains("observing"));
    }
}
