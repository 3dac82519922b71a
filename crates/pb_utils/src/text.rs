//! Text helpers shared by the port compiler and the value converters.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use heck::ToLowerCamelCase;

/// Converts a Rust field name to its default wire name.
///
/// # Examples
///
/// ```
/// use pb_utils::text::lower_camel;
///
/// assert_eq!(lower_camel("content_type"), "contentType");
/// assert_eq!(lower_camel("a"), "a");
/// ```
pub fn lower_camel(name: &str) -> String {
    name.to_lower_camel_case()
}

/// Splits a comma separated option value, keeping empty segments.
///
/// # Examples
///
/// ```
/// use pb_utils::text::split_list;
///
/// assert_eq!(split_list("a,b"), ["a", "b"]);
/// assert_eq!(split_list(""), [""]);
/// ```
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(ToString::to_string).collect()
}

/// Splits `key=value`, where a missing `=` yields `None` for the value.
///
/// # Examples
///
/// ```
/// use pb_utils::text::split_pair;
///
/// assert_eq!(split_pair("header=contentType"), ("header", Some("contentType")));
/// assert_eq!(split_pair("body"), ("body", None));
/// ```
pub fn split_pair(value: &str) -> (&str, Option<&str>) {
    match value.split_once('=') {
        Some((key, value)) => (key, Some(value)),
        None => (value, None),
    }
}

#[cfg(test)]
mod tests {
    use super::{lower_camel, split_pair};

    #[test]
    fn camel_from_snake() {
        assert_eq!(lower_camel("message_id"), "messageId");
        assert_eq!(lower_camel("Upper"), "upper");
    }

    #[test]
    fn pair_keeps_later_equals() {
        assert_eq!(split_pair("default=a=b"), ("default", Some("a=b")));
    }
}
