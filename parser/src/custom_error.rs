//! Custom error type that captures context strings from nom's context() combinator

use nom::error::{ContextError, ErrorKind, FromExternalError, ParseError};

/// A context string with the amount of input left when it was attached
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWithLocation {
    pub context: &'static str,
    pub remaining: usize,
}

/// Parse error that remembers how far parsing got and which contexts it was in.
///
/// Progress is measured as the length of the unconsumed input, so comparing
/// two errors needs no access to the full source text. When `alt` combines
/// branch failures the error that got furthest wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextualError<I> {
    pub input: I,
    pub code: ErrorKind,
    /// Context strings, innermost first
    pub contexts: Vec<ContextWithLocation>,
}

impl<I: AsRef<str>> ContextualError<I> {
    pub fn new(input: I, code: ErrorKind) -> Self {
        Self {
            input,
            code,
            contexts: Vec::new(),
        }
    }

    /// Unconsumed input length at the failure point
    pub fn remaining(&self) -> usize {
        self.input.as_ref().len()
    }

    /// Byte offset of the failure inside `full`
    pub fn byte_offset(&self, full: &str) -> usize {
        full.len().saturating_sub(self.remaining())
    }

    /// The innermost context attached at or after the failure point
    pub fn innermost_context(&self) -> Option<&'static str> {
        self.contexts.first().map(|c| c.context)
    }

    fn deepest(&self) -> usize {
        self.contexts
            .iter()
            .map(|c| c.remaining)
            .min()
            .unwrap_or(usize::MAX)
            .min(self.remaining())
    }
}

impl<I: AsRef<str>> ParseError<I> for ContextualError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        Self::new(input, kind)
    }

    fn or(self, other: Self) -> Self {
        // Keep the branch that consumed more input
        let self_deepest = self.deepest();
        let other_deepest = other.deepest();

        if self_deepest < other_deepest {
            self
        } else if other_deepest < self_deepest {
            other
        } else if self.contexts.len() >= other.contexts.len() {
            self
        } else {
            other
        }
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        // The inner error already points at the real failure
        other
    }
}

impl<I: AsRef<str>> ContextError<I> for ContextualError<I> {
    fn add_context(input: I, ctx: &'static str, mut other: Self) -> Self {
        other.contexts.push(ContextWithLocation {
            context: ctx,
            remaining: input.as_ref().len(),
        });
        other
    }
}

impl<I: AsRef<str>, E> FromExternalError<I, E> for ContextualError<I> {
    fn from_external_error(input: I, kind: ErrorKind, _e: E) -> Self {
        Self::new(input, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_prefers_deeper_progress() {
        let full = "abcdef";
        let shallow = ContextualError::new(&full[1..], ErrorKind::Tag);
        let deep = ContextualError::new(&full[4..], ErrorKind::Tag);

        let combined = shallow.clone().or(deep.clone());
        assert_eq!(combined.byte_offset(full), 4);

        let combined = deep.or(shallow);
        assert_eq!(combined.byte_offset(full), 4);
    }

    #[test]
    fn test_contexts_are_innermost_first() {
        let error = ContextualError::new("x", ErrorKind::Char);
        let error = ContextualError::add_context("x", "expected ';'", error);
        let error = ContextualError::add_context("yx", "statement", error);
        assert_eq!(error.innermost_context(), Some("expected ';'"));
        assert_eq!(error.contexts.len(), 2);
    }
}
