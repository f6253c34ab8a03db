/// Lower-cases `name` and collapses every run of non-alphanumerics into one
/// `-`. Names without any slug characters become `term`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "term".to_string()
    } else {
        out
    }
}

/// First of `base`, `base-2`, `base-3`, ... for which `taken` is false.
pub fn unique_slug<E>(
    base: &str,
    mut taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    if !taken(base)? {
        return Ok(base.to_string());
    }
    let mut suffix = 2u32;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::{slugify, unique_slug};

    #[test]
    fn slugify_collapses_punctuation_and_case() {
        assert_eq!(slugify("New York"), "new-york");
        assert_eq!(slugify("  Arts & Culture!  "), "arts-culture");
        assert_eq!(slugify("Zürich"), "zürich");
        assert_eq!(slugify("0"), "0");
    }

    #[test]
    fn slugify_falls_back_for_symbol_only_names() {
        assert_eq!(slugify("&&"), "term");
    }

    #[test]
    fn unique_slug_appends_numeric_suffix() {
        let existing = ["north", "north-2"];
        let slug = unique_slug("north", |candidate| {
            Ok::<_, Infallible>(existing.contains(&candidate))
        })
        .expect("infallible");
        assert_eq!(slug, "north-3");

        let fresh = unique_slug("south", |candidate| {
            Ok::<_, Infallible>(existing.contains(&candidate))
        })
        .expect("infallible");
        assert_eq!(fresh, "south");
    }
}
