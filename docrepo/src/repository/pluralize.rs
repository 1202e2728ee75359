use std::collections::HashMap;

/// Turns a singular type name into a collection name.
pub trait Pluralizer: Send + Sync {
    fn pluralize(&self, word: &str) -> String;
}

const IRREGULARS: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
    ("datum", "data"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("criterion", "criteria"),
    ("analysis", "analyses"),
    ("thesis", "theses"),
    ("crisis", "crises"),
];

const UNCOUNTABLES: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "deer",
    "news",
    "data",
    "metadata",
    "feedback",
    "software",
];

const O_TAKES_ES: &[&str] = &["hero", "potato", "tomato", "echo", "veto", "torpedo"];

const F_TAKES_S: &[&str] = &["roof", "chief", "belief", "proof", "chef", "cliff", "reef"];

/// English pluralization for PascalCase type names.
///
/// Only the last word changes, so `BlogPost` becomes `BlogPosts` and
/// `SalesPerson` becomes `SalesPeople`.
pub struct EnglishPluralizer {
    irregulars: HashMap<&'static str, &'static str>,
}

impl EnglishPluralizer {
    pub fn new() -> Self {
        EnglishPluralizer {
            irregulars: IRREGULARS.iter().copied().collect(),
        }
    }

    fn pluralize_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if lower.is_empty() || UNCOUNTABLES.contains(&lower.as_str()) {
            return word.to_string();
        }

        let plural = match self.irregulars.get(lower.as_str()) {
            Some(plural) => plural.to_string(),
            None => regular_plural(&lower),
        };
        match_case(word, &plural)
    }
}

impl Default for EnglishPluralizer {
    fn default() -> Self {
        EnglishPluralizer::new()
    }
}

impl Pluralizer for EnglishPluralizer {
    fn pluralize(&self, word: &str) -> String {
        let split = last_word_start(word);
        let (prefix, last) = word.split_at(split);
        format!("{}{}", prefix, self.pluralize_word(last))
    }
}

fn regular_plural(word: &str) -> String {
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');
    let mut chars = word.chars().rev();
    let last = chars.next().unwrap_or_default();
    let before = chars.next();

    if word.ends_with("ss")
        || word.ends_with("sh")
        || word.ends_with("ch")
        || matches!(last, 's' | 'x' | 'z')
    {
        return format!("{}es", word);
    }

    if last == 'y' && before.is_some_and(|c| !is_vowel(c)) {
        return format!("{}ies", &word[..word.len() - 1]);
    }

    if word.ends_with("fe") {
        return format!("{}ves", &word[..word.len() - 2]);
    }
    if last == 'f' && !F_TAKES_S.contains(&word) {
        return format!("{}ves", &word[..word.len() - 1]);
    }

    if last == 'o' && O_TAKES_ES.contains(&word) {
        return format!("{}es", word);
    }

    format!("{}s", word)
}

/// Byte offset where the last PascalCase word starts.
fn last_word_start(word: &str) -> usize {
    let mut start = 0;
    let mut previous: Option<char> = None;
    for (index, c) in word.char_indices() {
        if let Some(prev) = previous {
            if c.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit()) {
                start = index;
            }
        }
        previous = Some(c);
    }
    start
}

fn match_case(original: &str, plural: &str) -> String {
    if original.len() > 1 && original.chars().all(|c| !c.is_lowercase()) {
        return plural.to_uppercase();
    }
    match original.chars().next() {
        Some(first) if first.is_uppercase() => {
            let mut chars = plural.chars();
            match chars.next() {
                Some(head) => head.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => plural.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plural(word: &str) -> String {
        EnglishPluralizer::new().pluralize(word)
    }

    #[test]
    fn test_regular_forms() {
        assert_eq!(plural("Post"), "Posts");
        assert_eq!(plural("Box"), "Boxes");
        assert_eq!(plural("Address"), "Addresses");
        assert_eq!(plural("Branch"), "Branches");
        assert_eq!(plural("Category"), "Categories");
        assert_eq!(plural("Day"), "Days");
        assert_eq!(plural("Knife"), "Knives");
        assert_eq!(plural("Leaf"), "Leaves");
        assert_eq!(plural("Roof"), "Roofs");
        assert_eq!(plural("Hero"), "Heroes");
        assert_eq!(plural("Photo"), "Photos");
    }

    #[test]
    fn test_irregular_and_uncountable() {
        assert_eq!(plural("Person"), "People");
        assert_eq!(plural("Child"), "Children");
        assert_eq!(plural("Sheep"), "Sheep");
        assert_eq!(plural("Equipment"), "Equipment");
    }

    #[test]
    fn test_only_last_word_changes() {
        assert_eq!(plural("BlogPost"), "BlogPosts");
        assert_eq!(plural("SalesPerson"), "SalesPeople");
        assert_eq!(plural("OrderCategory"), "OrderCategories");
    }

    #[test]
    fn test_lower_case_and_acronyms() {
        assert_eq!(plural("post"), "posts");
        assert_eq!(plural("URL"), "URLS");
        assert_eq!(plural(""), "");
    }
}
