//! Context assembly for the answer prompt

use crate::index::{LexicalMatch, SimilarityMatch};

/// Paragraph-level delimiter placed between chunk texts
pub const CHUNK_DELIMITER: &str = "\n\n";

/// Anything whose text can be placed into the prompt context
pub trait ContextItem {
    fn context_text(&self) -> &str;
}

impl ContextItem for SimilarityMatch {
    fn context_text(&self) -> &str {
        &self.content
    }
}

impl ContextItem for LexicalMatch {
    fn context_text(&self) -> &str {
        &self.content
    }
}

/// Concatenated chunk texts and how many chunks went into them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub count: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Joins retrieved chunks, in order, under an optional character budget
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler {
    max_chars: Option<usize>,
}

impl ContextAssembler {
    pub fn new(max_chars: Option<usize>) -> Self {
        Self { max_chars }
    }

    /// Join item texts with `CHUNK_DELIMITER`.
    ///
    /// Whole items are appended while they fit the budget. A first item that
    /// alone exceeds the budget is cut at a character boundary; later items
    /// that do not fit are left out. `count` is the number of items used.
    pub fn assemble<T: ContextItem>(&self, items: &[T]) -> AssembledContext {
        let mut context = AssembledContext::default();

        for item in items {
            let text = item.context_text();
            let separator = if context.count == 0 { "" } else { CHUNK_DELIMITER };

            match self.max_chars {
                Some(budget) => {
                    let used = context.text.chars().count();
                    let needed = separator.chars().count() + text.chars().count();
                    if used + needed <= budget {
                        context.text.push_str(separator);
                        context.text.push_str(text);
                        context.count += 1;
                    } else if context.count == 0 {
                        context.text.extend(text.chars().take(budget));
                        context.count = 1;
                        break;
                    } else {
                        break;
                    }
                }
                None => {
                    context.text.push_str(separator);
                    context.text.push_str(text);
                    context.count += 1;
                }
            }
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexical(contents: &[&str]) -> Vec<LexicalMatch> {
        contents
            .iter()
            .map(|c| LexicalMatch {
                content: c.to_string(),
                tags: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let context = ContextAssembler::new(None).assemble::<SimilarityMatch>(&[]);

        assert_eq!(context.text, "");
        assert_eq!(context.count, 0);
        assert!(context.is_empty());
    }

    #[test]
    fn test_joins_in_order_with_paragraph_breaks() {
        let matches = vec![
            SimilarityMatch {
                id: "a".to_string(),
                content: "first".to_string(),
                similarity: 0.9,
            },
            SimilarityMatch {
                id: "b".to_string(),
                content: "second".to_string(),
                similarity: 0.8,
            },
        ];
        let context = ContextAssembler::new(None).assemble(&matches);

        assert_eq!(context.text, "first\n\nsecond");
        assert_eq!(context.count, 2);
    }

    #[test]
    fn test_budget_stops_at_whole_items() {
        let context =
            ContextAssembler::new(Some(12)).assemble(&lexical(&["alpha", "beta", "gamma"]));

        // "alpha\n\nbeta" is 11 characters; gamma would exceed 12
        assert_eq!(context.text, "alpha\n\nbeta");
        assert_eq!(context.count, 2);
    }

    #[test]
    fn test_oversized_first_item_is_truncated() {
        let context = ContextAssembler::new(Some(4)).assemble(&lexical(&["héllo world", "x"]));

        assert_eq!(context.text, "héll");
        assert_eq!(context.count, 1);
    }
}
