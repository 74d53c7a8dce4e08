//! `expect`-style assertions for test bodies
//!
//! Every matcher returns `Result<(), AssertionError>` so it composes with `?`
//! inside hooks and inline checks. The error carries rendered expected and
//! received values for the reporter.

use crate::error::AssertionError;
use std::fmt::Debug;

/// Start an expectation on `actual`
pub fn expect<T>(actual: T) -> Expectation<T> {
    Expectation {
        actual,
        negated: false,
    }
}

/// Pending expectation on a value
#[derive(Debug)]
pub struct Expectation<T> {
    actual: T,
    negated: bool,
}

impl<T: Debug> Expectation<T> {
    /// Invert the next matcher
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    fn verdict(
        &self,
        pass: bool,
        matcher: &str,
        expected: String,
    ) -> Result<(), AssertionError> {
        if pass != self.negated {
            return Ok(());
        }
        let prefix = if self.negated { "not." } else { "" };
        Err(AssertionError::new(
            expected,
            format!("{:?}", self.actual),
            format!("expect(received).{}{}(expected)", prefix, matcher),
        ))
    }

    /// Equality with `PartialEq`
    pub fn to_be<U>(&self, expected: U) -> Result<(), AssertionError>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        let pass = self.actual == expected;
        self.verdict(pass, "toBe", format!("{:?}", expected))
    }

    /// Structural equality on the debug rendering of both sides.
    ///
    /// Useful for comparing values of different but equivalent types, such as
    /// a `Vec<&str>` against a `Vec<String>`.
    pub fn to_equal<U: Debug>(&self, expected: U) -> Result<(), AssertionError> {
        let expected = format!("{:?}", expected);
        let pass = format!("{:?}", self.actual) == expected;
        self.verdict(pass, "toEqual", expected)
    }
}

impl<T: AsRef<str> + Debug> Expectation<T> {
    /// Substring match
    pub fn to_contain(&self, needle: &str) -> Result<(), AssertionError> {
        let pass = self.actual.as_ref().contains(needle);
        self.verdict(pass, "toContain", format!("{:?}", needle))
    }
}

impl Expectation<bool> {
    pub fn to_be_truthy(&self) -> Result<(), AssertionError> {
        self.verdict(self.actual, "toBeTruthy", "true".to_string())
    }
}

impl<T: Debug> Expectation<Option<T>> {
    pub fn to_be_some(&self) -> Result<(), AssertionError> {
        self.verdict(self.actual.is_some(), "toBeDefined", "Some(_)".to_string())
    }
}
