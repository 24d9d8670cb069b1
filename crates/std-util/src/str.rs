//! Identifier casing and inflection shared by the model builders and the
//! scaffolder.

use heck::ToUpperCamelCase;

/// Pluralizes the last word of an UpperCamelCase or plain identifier.
pub fn pluralize(word: &str) -> String {
    inflect_last_word(word, 2)
}

pub fn singularize(word: &str) -> String {
    inflect_last_word(word, 1)
}

/// `pluralizer` recases whole words, so only the last camel-case word is
/// handed to it.
fn inflect_last_word(word: &str, count: isize) -> String {
    let bytes = word.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|i| bytes[*i].is_ascii_uppercase() && bytes[*i - 1].is_ascii_lowercase())
        .unwrap_or(0);

    let (head, last) = word.split_at(split);
    format!("{head}{}", pluralizer::pluralize(last, count, false))
}

pub fn upper_camel(name: &str) -> String {
    name.to_upper_camel_case()
}

/// Returns `true` if `name` starts with `prefix`, ignoring ASCII case.
pub fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len()
        && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Appends the smallest numeric suffix (starting at 1) that makes `base`
/// unused according to `is_taken`.
pub fn uniquify(base: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }

    let mut n = 1;
    loop {
        let candidate = format!("{base}{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflection() {
        assert_eq!(pluralize("Blog"), "Blogs");
        assert_eq!(singularize("Categories"), "Category");
        assert_eq!(pluralize("OrderItem"), "OrderItems");
        assert_eq!(singularize("BlogPosts"), "BlogPost");
        assert_eq!(upper_camel("order_items"), "OrderItems");
    }

    #[test]
    fn prefix_match_ignores_case() {
        assert!(starts_with_ignore_case("BlogId", "blog"));
        assert!(!starts_with_ignore_case("Id", "blog"));
    }

    #[test]
    fn uniquify_appends_suffix() {
        let taken = ["Post", "Post1"];
        assert_eq!(uniquify("Post", |n| taken.contains(&n)), "Post2");
        assert_eq!(uniquify("Blog", |n| taken.contains(&n)), "Blog");
    }
}
