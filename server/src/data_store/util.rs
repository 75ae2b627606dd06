/// Trim a search text entered by the user. Returns None if nothing is left, i.e. the search
/// should not filter anything.
pub fn normalize_search_term(search: &str) -> Option<String> {
    let search = search.trim();
    if search.is_empty() {
        None
    } else {
        Some(search.to_owned())
    }
}

/// Case-insensitive substring check, matching the semantics of SQL `ILIKE '%term%'`
pub fn contains_ignore_case(haystack: &str, term: &str) -> bool {
    haystack.to_lowercase().contains(&term.to_lowercase())
}

/// Build a SQL LIKE pattern matching any text containing the given term. Wildcard characters in
/// the term are escaped with PostgreSQL's default escape character (backslash).
pub fn sql_contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
