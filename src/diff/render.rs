use std::fmt::Write;

use super::Diff;

/// Format a diff for the terminal: `+` added, `-` removed, `~` changed, with
/// the `=` column aligned past the longest name. Values are quoted.
pub fn render(diff: &Diff) -> String {
    let width = diff
        .added
        .keys()
        .chain(diff.removed.keys())
        .chain(diff.changed.keys())
        .map(|name| name.len())
        .max()
        .unwrap_or(0);
    let pad = |name: &str| " ".repeat(width - name.len() + 2);

    let mut out = String::new();
    for (name, value) in &diff.added {
        let _ = writeln!(out, "+ {}{}=  {:?}", name, pad(name), value);
    }
    for (name, value) in &diff.removed {
        let _ = writeln!(out, "- {}{}=  {:?}", name, pad(name), value);
    }
    for (name, change) in &diff.changed {
        let _ = writeln!(
            out,
            "~ {}{}=  {:?} => {:?}",
            name,
            pad(name),
            change.old,
            change.new
        );
    }
    out
}
