use super::model::{NOUN_TAG, NounDocument, Token};

/// Lowercased lemmas of every token tagged `tag`, space-joined in token order.
pub fn extract_tokens<'a, I>(tokens: I, tag: &str) -> String
where
    I: IntoIterator<Item = &'a Token>,
{
    tokens
        .into_iter()
        .filter(|t| t.tag() == tag)
        .map(|t| t.lemma.to_lowercase())
        .collect::<Vec<String>>()
        .join(" ")
}

/// The noun document of a review's tokens. Empty when there are no nouns.
pub fn extract_nouns<'a, I>(tokens: I) -> NounDocument
where
    I: IntoIterator<Item = &'a Token>,
{
    extract_tokens(tokens, NOUN_TAG).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tem::model::Tokens;

    fn tokens(pairs: &[(&str, &str)]) -> Tokens {
        pairs.iter().map(|(l, t)| Token::new(*l, *t)).collect()
    }

    #[test]
    fn test_extract_nouns() {
        let toks = tokens(&[("Store", "NOUN"), ("Good", "ADJ")]);
        assert_eq!(extract_nouns(&toks).as_str(), "store");
    }

    #[test]
    fn test_extract_nouns_keeps_order() {
        let toks = tokens(&[
            ("Staff", "NOUN"),
            ("be", "VERB"),
            ("very", "ADV"),
            ("friendly", "ADJ"),
            ("Checkout", "NOUN"),
            ("Line", "NOUN"),
        ]);
        assert_eq!(extract_nouns(&toks).as_str(), "staff checkout line");
    }

    #[test]
    fn test_extract_nouns_empty() {
        assert_eq!(extract_nouns(&Tokens::default()).as_str(), "");
        let toks = tokens(&[("quick", "ADJ"), ("go", "VERB")]);
        assert_eq!(extract_nouns(&toks).as_str(), "");
    }

    #[test]
    fn test_extract_nouns_idempotent() {
        let toks = tokens(&[("Price", "NOUN"), ("cheap", "ADJ"), ("Sale", "NOUN")]);
        assert_eq!(extract_nouns(&toks), extract_nouns(&toks));
    }

    #[test]
    fn test_extract_other_tags() {
        let toks = tokens(&[("Store", "NOUN"), ("Good", "ADJ"), ("Clean", "ADJ")]);
        assert_eq!(extract_tokens(&toks, "ADJ"), "good clean");
    }
}
