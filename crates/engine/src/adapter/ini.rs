//! Minimal INI merging for emulator config files.
//!
//! Only the keys an adapter needs are touched; every other line (comments,
//! ordering, unknown sections) survives a merge untouched.

use std::fs;
use std::io;
use std::path::Path;

/// `(section, key, value)`
pub(crate) type IniSetting = (&'static str, &'static str, &'static str);

/// Merge `settings` into the INI file at `path`, creating it if needed.
pub(crate) fn merge_file(path: &Path, settings: &[IniSetting]) -> io::Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, merge(&existing, settings))
}

pub(crate) fn merge(text: &str, settings: &[IniSetting]) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    for (section, key, value) in settings {
        set(&mut lines, section, key, value);
    }
    let mut merged = lines.join("\n");
    merged.push('\n');
    merged
}

fn set(lines: &mut Vec<String>, section: &str, key: &str, value: &str) {
    let entry = format!("{key} = {value}");
    let Some(header) = lines.iter().position(|line| section_name(line).is_some_and(|s| s.eq_ignore_ascii_case(section)))
    else {
        if lines.last().is_some_and(|l| !l.trim().is_empty()) {
            lines.push(String::new());
        }
        lines.push(format!("[{section}]"));
        lines.push(entry);
        return;
    };
    let end = lines[header + 1..].iter().position(|line| section_name(line).is_some()).map_or(lines.len(), |i| header + 1 + i);
    if let Some(existing) = lines[header + 1..end].iter().position(|line| key_name(line).is_some_and(|k| k.eq_ignore_ascii_case(key))) {
        lines[header + 1 + existing] = entry;
        return;
    }
    // Insert after the last non-blank line of the section.
    let insert_at = lines[header + 1..end].iter().rposition(|l| !l.trim().is_empty()).map_or(header + 1, |i| header + 2 + i);
    lines.insert(insert_at, entry);
}

fn section_name(line: &str) -> Option<&str> {
    line.trim().strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

fn key_name(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.starts_with(';') || line.starts_with('#') {
        return None;
    }
    line.split_once('=').map(|(key, _)| key.trim())
}
