//! Display-name helpers.

/// Title-case a string: the first letter of every run of letters is
/// uppercased and the rest of the run lowercased.
///
/// A "run" is broken by any non-alphabetic character, so digits and
/// punctuation start a new word (`"abc2def"` → `"Abc2Def"`).
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_is_letter = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word() {
        assert_eq!(title_case("xyz"), "Xyz");
    }

    #[test]
    fn multiple_words() {
        assert_eq!(title_case("form building"), "Form Building");
    }

    #[test]
    fn lowercases_tail() {
        assert_eq!(title_case("hELLO wORLD"), "Hello World");
    }

    #[test]
    fn digits_break_words() {
        assert_eq!(title_case("abc2def"), "Abc2Def");
    }

    #[test]
    fn punctuation_breaks_words() {
        assert_eq!(title_case("step-one"), "Step-One");
    }

    #[test]
    fn empty() {
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn non_ascii_letters() {
        assert_eq!(title_case("éclair"), "Éclair");
    }
}
