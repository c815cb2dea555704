//! Exclusion patterns shared by the step hasher and the copier.
//!
//! Both sides must call [`is_excluded`] with the same arguments: the path of
//! the entry relative to the copy source and its bare file name. If they
//! disagree, skip detection and the actual transfer drift apart.

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: true,
  require_literal_leading_dot: false,
};

const RECURSIVE_WILDCARD: &str = "**";

/// Returns true if any of `patterns` matches the entry.
///
/// A pattern matches when it glob-matches the whole normalized `path`, the
/// bare `name`, or any single segment of `path`. Patterns containing `**`
/// are matched segment by segment, `**` standing for any number of segments.
/// Patterns without wildcards also match a run of whole segments anywhere in
/// the path.
pub fn is_excluded(path: &str, name: &str, patterns: &[String]) -> bool {
  let path = normalize(path);

  patterns
    .iter()
    .any(|pattern| matches_pattern(&path, name, pattern))
}

pub fn normalize(path: &str) -> String {
  let path = path.replace('\\', "/");
  let path = path.trim_start_matches("./");

  path.trim_matches('/').to_string()
}

fn matches_pattern(path: &str, name: &str, pattern: &str) -> bool {
  let pattern = normalize(pattern.trim());
  if pattern.is_empty() {
    return false;
  }

  let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

  if pattern.contains(RECURSIVE_WILDCARD) {
    let pattern: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    return match_segments(&pattern, &segments);
  }

  if glob_match(&pattern, path) || glob_match(&pattern, name) {
    return true;
  }

  if segments.iter().any(|segment| glob_match(&pattern, segment)) {
    return true;
  }

  !has_wildcard(&pattern) && contains_segments(&segments, &pattern)
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
  match pattern.split_first() {
    None => path.is_empty(),
    Some((&RECURSIVE_WILDCARD, rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
    Some((head, rest)) => match path.split_first() {
      Some((segment, tail)) => glob_match(head, segment) && match_segments(rest, tail),
      None => false,
    },
  }
}

fn contains_segments(segments: &[&str], pattern: &str) -> bool {
  let needle: Vec<&str> = pattern.split('/').collect();
  if needle.len() > segments.len() {
    return false;
  }

  segments.windows(needle.len()).any(|window| window == needle.as_slice())
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
  match Pattern::new(pattern) {
    Ok(compiled) => compiled.matches_with(candidate, MATCH_OPTIONS),
    // Invalid globs such as an unclosed `[` are compared literally
    Err(_) => pattern == candidate,
  }
}

fn has_wildcard(pattern: &str) -> bool {
  pattern.contains(['*', '?', '['])
}
