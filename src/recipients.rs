use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// Ordered set of lowercase email addresses the agent may send to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientList {
    entries: Vec<String>,
}

impl RecipientList {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.entries.iter().any(|e| e == email)
    }

    /// Normalises and appends `input`, returning the stored form.
    pub fn add(&mut self, input: &str) -> Result<String, ValidationError> {
        let email = input.trim().to_lowercase();
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail(email));
        }
        if self.contains(&email) {
            return Err(ValidationError::DuplicateRecipient(email));
        }
        self.entries.push(email.clone());
        Ok(email)
    }

    /// Exact-match removal. Returns whether anything was removed.
    pub fn remove(&mut self, email: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != email);
        self.entries.len() != before
    }

    pub fn replace(&mut self, entries: Vec<String>) {
        self.entries = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_normalises_and_rejects_case_insensitive_duplicates() {
        let mut list = RecipientList::default();
        assert_eq!(list.add("  A@Example.com ").unwrap(), "a@example.com");
        assert_eq!(
            list.add("a@example.com"),
            Err(ValidationError::DuplicateRecipient("a@example.com".into()))
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn add_rejects_empty_and_malformed_input() {
        let mut list = RecipientList::default();
        assert_eq!(list.add("   "), Err(ValidationError::EmptyEmail));
        for bad in ["plainaddress", "no@tld", "two@@example.com", "sp ace@example.com", "@example.com"] {
            assert!(matches!(list.add(bad), Err(ValidationError::InvalidEmail(_))), "{bad}");
        }
        assert!(list.is_empty());
    }

    #[test]
    fn valid_shapes_are_accepted_once() {
        let mut list = RecipientList::default();
        for good in ["x@y.io", "first.last+tag@mail.example.org", "UPPER@CASE.COM"] {
            assert!(list.add(good).is_ok(), "{good}");
            assert!(list.add(good).is_err(), "{good} twice");
        }
        assert_eq!(list.as_slice(), ["x@y.io", "first.last+tag@mail.example.org", "upper@case.com"]);
    }

    #[test]
    fn remove_is_exact_and_tolerates_absence() {
        let mut list = RecipientList::new(vec!["a@b.co".into(), "c@d.co".into()]);
        assert!(!list.remove("A@B.CO"));
        assert!(list.remove("a@b.co"));
        assert!(!list.remove("a@b.co"));
        assert_eq!(list.as_slice(), ["c@d.co"]);
    }
}
