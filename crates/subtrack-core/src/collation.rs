//! Locale-aware ordering of display names

use std::cmp::Ordering;

use feruca::Collator;

/// Compares display names with the Unicode Collation Algorithm (CLDR root
/// table), so "Éclair" sorts with the E's and "Ёлка" with the Е's.
///
/// Names that collate equal fall back to a raw comparison, keeping the order
/// total.
pub struct NameOrder {
    collator: Collator,
}

impl NameOrder {
    pub fn new() -> Self {
        Self {
            collator: Collator::default(),
        }
    }

    pub fn compare(&mut self, a: &str, b: &str) -> Ordering {
        self.collator.collate(a, b).then_with(|| a.cmp(b))
    }
}

impl Default for NameOrder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut order = NameOrder::new();
        let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        names.sort_by(|a, b| order.compare(a, b));
        names
    }

    #[test]
    fn test_accented_latin_sorts_with_base_letter() {
        assert_eq!(sorted(&["Zeta", "Éclair", "eBay"]), vec!["eBay", "Éclair", "Zeta"]);
    }

    #[test]
    fn test_cyrillic_yo_sorts_after_ye() {
        assert_eq!(sorted(&["Яндекс", "Жара", "Ёлка"]), vec!["Ёлка", "Жара", "Яндекс"]);
    }

    #[test]
    fn test_case_variants_stay_distinct_and_ordered() {
        let mut order = NameOrder::new();
        assert_ne!(order.compare("netflix", "Netflix"), Ordering::Equal);
        assert_eq!(order.compare("Netflix", "Netflix"), Ordering::Equal);
        assert_eq!(order.compare("alpha", "Beta"), Ordering::Less);
    }
}
