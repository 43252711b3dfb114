//! English plurals for table display collection names

/// Plural of a display name; only the last word changes (`project task` → `project tasks`)
pub fn pluralize_entity_name(entity_name: &str) -> String {
    if entity_name.is_empty() {
        return String::new();
    }

    let lower = entity_name.to_lowercase();
    let stem = |n: usize| &entity_name[..entity_name.len() - n];
    let before_last = lower.chars().rev().nth(1);
    let is_consonant = |c: Option<char>| c.is_some_and(|c| c.is_alphabetic() && !"aeiou".contains(c));

    // quiz -> quizzes
    if lower.ends_with('z') && !lower.ends_with("zz") {
        return format!("{}zes", entity_name);
    }
    if ["s", "sh", "ch", "x", "zz"].iter().any(|end| lower.ends_with(end)) {
        return format!("{}es", entity_name);
    }
    if lower.ends_with('y') && is_consonant(before_last) {
        return format!("{}ies", stem(1));
    }
    if lower.ends_with("fe") {
        return format!("{}ves", stem(2));
    }
    if lower.ends_with('f') && !lower.ends_with("ff") {
        return format!("{}ves", stem(1));
    }
    if lower.ends_with('o') && is_consonant(before_last) {
        return format!("{}es", entity_name);
    }

    format!("{}s", entity_name)
}
