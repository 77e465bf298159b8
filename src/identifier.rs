//! Derivation of document-bundle identifiers.
//!
//! Reproduces the id scheme used by the migration tooling so that bundles
//! created here and bundles created by other tools land on the same ids.

/// Derives the bundle id for an issue: `<issn>-<year>` followed by `v`, `n`
/// and `s` tokens for each non-empty label, joined with `-`.
///
/// Purely numeric labels are canonicalized through an integer round-trip,
/// dropping leading zeros (`"007"` becomes `v7`). Callers guarantee a
/// non-empty `issn_id` and `year`; every issue resolves to a parent journal
/// and a publication year before reaching this point.
pub fn bundle_id(
    issn_id: &str,
    year: &str,
    volume: Option<&str>,
    number: Option<&str>,
    supplement: Option<&str>,
) -> String {
    let mut tokens = vec![issn_id.to_string(), year.to_string()];

    for (prefix, label) in [("v", volume), ("n", number), ("s", supplement)] {
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            tokens.push(format!("{prefix}{}", canonical_label(label)));
        }
    }

    tokens.join("-")
}

fn canonical_label(label: &str) -> String {
    if label.chars().all(|c| c.is_ascii_digit()) {
        // Labels longer than u64 fall back to their original form.
        label
            .parse::<u64>()
            .map(|n| n.to_string())
            .unwrap_or_else(|_| label.to_string())
    } else {
        label.to_string()
    }
}
