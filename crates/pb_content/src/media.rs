use crate::ContentError;

/// Strips parameters from a MIME type and lower-cases the remainder.
///
/// # Examples
///
/// ```
/// use pb_content::base_media_type;
///
/// let base = base_media_type("Application/JSON; charset=utf-8").unwrap();
/// assert_eq!(base, "application/json");
/// assert!(base_media_type("json").is_err());
/// ```
pub fn base_media_type(mime: &str) -> Result<String, ContentError> {
    let essence = match mime.split_once(';') {
        Some((essence, _)) => essence,
        None => mime,
    }
    .trim();

    let invalid = |reason| ContentError::InvalidMediaType {
        mime: mime.to_owned(),
        reason,
    };

    if essence.is_empty() {
        return Err(invalid("no media type"));
    }
    let (kind, subtype) = essence.split_once('/').ok_or_else(|| invalid("expected slash"))?;
    if !is_token(kind) || !is_token(subtype) {
        return Err(invalid("expected token after slash"));
    }

    Ok(essence.to_ascii_lowercase())
}

fn is_token(part: &str) -> bool {
    !part.is_empty()
        && part.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::base_media_type;

    #[test]
    fn parameters_are_dropped() {
        assert_eq!(base_media_type("text/plain;charset=ascii").unwrap(), "text/plain");
        assert_eq!(base_media_type(" application/xml ").unwrap(), "application/xml");
    }

    #[test]
    fn malformed_types_fail() {
        assert!(base_media_type("").is_err());
        assert!(base_media_type("application/").is_err());
        assert!(base_media_type("a/b/c").is_err());
    }
}
