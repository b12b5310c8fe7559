use std::collections::{HashMap, HashSet};

use crate::ResultRow;

/// Drops repeated `(name, category)` pairs, keeping the first occurrence.
/// Returns the remaining rows and how many were removed.
pub fn dedup_rows(rows: Vec<ResultRow>) -> (Vec<ResultRow>, usize) {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<ResultRow> = rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// A name that shows up under more than one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateName {
    pub name: String,
    /// Categories in first-seen order with their occurrence count.
    pub categories: Vec<(String, usize)>,
}

/// Names appearing under two or more distinct categories, sorted case-insensitively.
pub fn duplicate_names(rows: &[ResultRow]) -> Vec<DuplicateName> {
    let mut by_name: HashMap<&str, Vec<(String, usize)>> = HashMap::new();
    for row in rows {
        let categories = by_name.entry(row.name.as_str()).or_default();
        match categories.iter_mut().find(|(cat, _)| *cat == row.category) {
            Some((_, count)) => *count += 1,
            None => categories.push((row.category.clone(), 1)),
        }
    }

    let mut dups: Vec<DuplicateName> = by_name
        .into_iter()
        .filter(|(_, categories)| categories.len() > 1)
        .map(|(name, categories)| DuplicateName {
            name: name.to_owned(),
            categories,
        })
        .collect();
    dups.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    dups
}

pub fn print_duplicate_report(dups: &[DuplicateName]) {
    if dups.is_empty() {
        println!("\nNo athlete appears under more than one category.");
        return;
    }
    println!("\nAthletes in more than one category:");
    for dup in dups {
        let categories = dup
            .categories
            .iter()
            .map(|(cat, count)| format!("{cat} ×{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {}: {categories}", dup.name);
    }
}
