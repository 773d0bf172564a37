//! SQL identifier quoting and route segment derivation.
//!
//! Every identifier that reaches generated SQL goes through [`quote_ident`].
//! Identifiers are never bound as parameters and never interpolated raw.

/// Separator between namespace and table name in a route segment.
///
/// Tables whose namespace or name contains this separator are skipped at
/// introspection time so that segments always reverse-map unambiguously.
pub const ROUTE_SEPARATOR: &str = "__";

/// The namespace whose tables are addressed by bare table name.
pub const DEFAULT_NAMESPACE: &str = "public";

/// Quote a catalog name as a SQL identifier.
///
/// Wraps the name in double quotes and doubles every embedded double quote,
/// which is sufficient for any catalog name Postgres will accept.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Build the two-part quoted identifier `"ns"."name"`.
pub fn qualified_identifier(namespace: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(namespace), quote_ident(name))
}

/// Parse a quoted qualified identifier back into `(namespace, name)`.
///
/// Inverse of [`qualified_identifier`]; returns `None` for anything that is
/// not exactly two quoted parts joined by a dot.
pub fn parse_qualified(qualified: &str) -> Option<(String, String)> {
    let rest = qualified.strip_prefix('"')?;
    let (namespace, rest) = take_quoted(rest)?;
    let rest = rest.strip_prefix('.')?;
    let rest = rest.strip_prefix('"')?;
    let (name, rest) = take_quoted(rest)?;
    if rest.is_empty() {
        Some((namespace, name))
    } else {
        None
    }
}

/// Consume a quoted identifier body up to its closing quote, un-doubling
/// embedded quotes. Returns the decoded name and the unconsumed remainder.
fn take_quoted(input: &str) -> Option<(String, &str)> {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((i, ch)) = chars.next() {
        if ch != '"' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            // Doubled quote: literal quote inside the name.
            Some((_, '"')) => out.push('"'),
            Some((j, _)) => return Some((out, &input[j..])),
            None => return Some((out, &input[i + 1..])),
        }
    }
    None
}

/// Derive the URL-safe route segment for a table.
///
/// Tables in the default namespace are addressed by bare name; everything
/// else is `namespace__name`.
pub fn route_segment(namespace: &str, name: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        name.to_string()
    } else {
        format!("{namespace}{ROUTE_SEPARATOR}{name}")
    }
}

/// True when a catalog name would make its route segment ambiguous.
pub fn name_breaks_routing(name: &str) -> bool {
    name.contains(ROUTE_SEPARATOR)
}
