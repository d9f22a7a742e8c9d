//! Splitting a request string into path, query and fragment.
//!
//! `?` starts the query and `#` starts the fragment. A NUL character
//! escapes the character that follows it, so `a\0#b` is the literal path
//! `a#b`. A single leading `#` belongs to the path (internal imports).

/// A request split into its three parts. Escapes are already removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    pub request: String,
    /// Includes the leading `?` when present.
    pub query: String,
    /// Includes the leading `#` when present.
    pub fragment: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Part {
    Request,
    Query,
}

/// Split `identifier` into request, query and fragment.
///
/// Returns `None` when a NUL escape is not followed by any character.
#[must_use]
pub fn parse_identifier(identifier: &str) -> Option<Identifier> {
    let mut out = Identifier::default();
    let mut part = Part::Request;
    let mut chars = identifier.char_indices();

    if identifier.starts_with('#') {
        out.request.push('#');
        chars.next();
    }

    while let Some((idx, c)) = chars.next() {
        match c {
            '\0' => {
                let (_, escaped) = chars.next()?;
                match part {
                    Part::Request => out.request.push(escaped),
                    Part::Query => out.query.push(escaped),
                }
            }
            '#' => {
                out.fragment.push_str(&identifier[idx..]);
                return Some(out);
            }
            '?' if part == Part::Request => {
                part = Part::Query;
                out.query.push('?');
            }
            _ => match part {
                Part::Request => out.request.push(c),
                Part::Query => out.query.push(c),
            },
        }
    }
    Some(out)
}
