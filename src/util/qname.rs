//! Qualified name handling.
//!
//! A qualified name has the form `prefix:local` or just `local`. Builder
//! operations accept qualified names for elements and attributes and split
//! them here before the parts are stored on the node.

use std::borrow::Cow;

use crate::parser::input::{is_name_char, is_name_start_char};

/// Splits a qualified name into its prefix and local name parts.
///
/// Only the first colon separates the two.
///
/// # Examples
///
/// ```
/// use xmlscribe::util::qname::split_qname;
///
/// assert_eq!(split_qname("atom:link"), (Some("atom"), "link"));
/// assert_eq!(split_qname("item"), (None, "item"));
/// ```
#[must_use]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Joins a prefix and local name back into a qualified name.
#[must_use]
pub fn join_qname<'a>(prefix: Option<&str>, local: &'a str) -> Cow<'a, str> {
    match prefix {
        Some(p) if !p.is_empty() => Cow::Owned(format!("{p}:{local}")),
        _ => Cow::Borrowed(local),
    }
}

/// The attribute name that declares `prefix` (or the default namespace).
#[must_use]
pub fn xmlns_attribute_name(prefix: Option<&str>) -> Cow<'static, str> {
    match prefix {
        Some(p) if !p.is_empty() => Cow::Owned(format!("xmlns:{p}")),
        _ => Cow::Borrowed("xmlns"),
    }
}

/// Returns `true` if `name` is a well-formed qualified name: an XML name
/// with at most one colon, which may be neither first nor last.
///
/// ```
/// use xmlscribe::util::qname::is_valid_qname;
///
/// assert!(is_valid_qname("dc:title"));
/// assert!(!is_valid_qname("1st"));
/// assert!(!is_valid_qname("a:b:c"));
/// ```
#[must_use]
pub fn is_valid_qname(name: &str) -> bool {
    let (prefix, local) = split_qname(name);
    prefix.map_or(true, is_ncname) && is_ncname(local)
}

fn is_ncname(part: &str) -> bool {
    let mut chars = part.chars();
    chars
        .next()
        .is_some_and(|c| c != ':' && is_name_start_char(c))
        && chars.all(|c| c != ':' && is_name_char(c))
}
