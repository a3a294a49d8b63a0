//! Placeholder parsing and substitution for deferred task results.
//!
//! A step may reference the result of a dependency task with `$${name}`,
//! where `name` is the dependency's task name. The reference resolves at
//! execution time to the dependency's captured stdout, or to its declared
//! target path when nothing was captured.
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so shell variables like
//! `$HOME` and `$PATH` work naturally without any escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.

use thiserror::Error;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A reference to a dependency task's result.
  Task(String),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("empty placeholder at position {0}")]
  Empty(usize),

  #[error("task '{0}' has no result to reference")]
  UnresolvedTask(String),
}

/// Trait for resolving placeholder values during execution.
pub trait Resolver {
  /// Resolve a task result by task name.
  fn resolve_task(&self, name: &str) -> Result<&str, PlaceholderError>;
}

/// Parse a string containing `$${name}` placeholders into segments.
///
/// Single `$` passes through as literal text; `$$$` followed by `{` escapes
/// to a literal `$${`.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    // Lone $: shell variables pass through untouched.
    if !matches!(chars.peek(), Some((_, '$'))) {
      literal.push('$');
      continue;
    }
    chars.next();

    match chars.peek() {
      Some((_, '$')) => {
        // "$$$" + "{" escapes a literal "$${"; anything else stays literal.
        chars.next();
        if matches!(chars.peek(), Some((_, '{'))) {
          chars.next();
          literal.push_str("$${");
        } else {
          literal.push_str("$$$");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }
        if name.is_empty() {
          return Err(PlaceholderError::Empty(pos));
        }

        segments.push(Segment::Task(name));
      }
      _ => {
        // "$$" followed by neither $ nor {.
        literal.push_str("$$");
      }
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Collect the task names referenced by a string's placeholders.
pub fn task_refs(input: &str) -> Result<Vec<String>, PlaceholderError> {
  Ok(
    parse(input)?
      .into_iter()
      .filter_map(|segment| match segment {
        Segment::Task(name) => Some(name),
        Segment::Literal(_) => None,
      })
      .collect(),
  )
}

/// Substitute all placeholders in a string using the provided resolver.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in parse(input)? {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Task(name) => result.push_str(resolver.resolve_task(&name)?),
    }
  }

  Ok(result)
}
