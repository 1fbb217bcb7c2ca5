//! Chapter inference for extended-dialect items, which carry no explicit
//! chapter reference.

use ofitec_models::FALLBACK_CHAPTER_CODE;

/// Which rule placed an item in its chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterResolution<'a> {
    /// The part of the item code before its first `.` is a declared chapter.
    Prefix(&'a str),
    /// The item code itself is a declared chapter code.
    SameCode(&'a str),
    /// Neither rule matched.
    Fallback,
}

impl<'a> ChapterResolution<'a> {
    pub fn code(&self) -> &'a str {
        match self {
            Self::Prefix(code) | Self::SameCode(code) => code,
            Self::Fallback => FALLBACK_CHAPTER_CODE,
        }
    }
}

/// Resolve the chapter of an item from its code. The prefix rule is tried
/// before the same-code rule.
pub fn infer_chapter<'a, F>(item_code: &'a str, is_declared: F) -> ChapterResolution<'a>
where
    F: Fn(&str) -> bool,
{
    if let Some((prefix, _)) = item_code.split_once('.') {
        if is_declared(prefix) {
            return ChapterResolution::Prefix(prefix);
        }
    }
    if is_declared(item_code) {
        return ChapterResolution::SameCode(item_code);
    }
    ChapterResolution::Fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared<'a>(codes: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |code| codes.iter().any(|c| *c == code)
    }

    #[test]
    fn test_prefix_before_first_dot() {
        assert_eq!(infer_chapter("1.1", declared(&["1"])), ChapterResolution::Prefix("1"));
        assert_eq!(infer_chapter("1.2.3", declared(&["1", "1.2"])).code(), "1");
    }

    #[test]
    fn test_undeclared_prefix_falls_back() {
        assert_eq!(infer_chapter("2.1", declared(&["1"])), ChapterResolution::Fallback);
        assert_eq!(infer_chapter("X", declared(&["1"])).code(), "GENERAL");
    }

    #[test]
    fn test_same_code_as_chapter() {
        assert_eq!(infer_chapter("CH1", declared(&["CH1"])), ChapterResolution::SameCode("CH1"));
    }

    #[test]
    fn test_prefix_wins_over_same_code() {
        let resolution = infer_chapter("1.1", declared(&["1", "1.1"]));
        assert_eq!(resolution, ChapterResolution::Prefix("1"));
    }

    #[test]
    fn test_same_code_applies_when_prefix_undeclared() {
        assert_eq!(infer_chapter("A.1", declared(&["A.1"])), ChapterResolution::SameCode("A.1"));
    }

    #[test]
    fn test_leading_dot_has_empty_prefix() {
        assert_eq!(infer_chapter(".5", declared(&["1"])), ChapterResolution::Fallback);
    }
}
