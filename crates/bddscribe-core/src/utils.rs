//! String transformation utilities for file and identifier naming

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_is_lowercase = false;

    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            // Add underscore before uppercase letter if:
            // - Not at the start
            // - Previous character was lowercase
            if i > 0 && prev_is_lowercase {
                result.push('_');
            }
            result.push(ch.to_lowercase().next().unwrap());
            prev_is_lowercase = false;
        } else if ch.is_alphanumeric() {
            result.push(ch);
            prev_is_lowercase = ch.is_lowercase();
        } else if ch == '-' || ch == '_' || ch == ' ' || ch == '/' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            prev_is_lowercase = false;
        }
    }

    result.trim_matches('_').to_string()
}

/// Sanitize a string to be safe for use as a filename across all operating
/// systems. Replaces any non-alphanumeric characters with underscores.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derive the deterministic file stem for an endpoint's generated artifacts.
///
/// `GET /BookStore/v1/Books` becomes `GET_BookStore_v1_Books`; path
/// parameters like `{userId}` lose their braces the same way every other
/// non-alphanumeric character does.
pub fn endpoint_file_stem(method: &str, path: &str) -> String {
    let trimmed = path.trim_matches('/');
    let mut stem = sanitize_filename(&format!("{}_{}", method, trimmed));
    // Collapse runs introduced by adjacent separators
    while stem.contains("__") {
        stem = stem.replace("__", "_");
    }
    stem.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("findBooksByStatus"), "find_books_by_status");
        assert_eq!(to_snake_case("FindBooksByStatus"), "find_books_by_status");
        assert_eq!(to_snake_case("find-books-by-status"), "find_books_by_status");
        assert_eq!(to_snake_case("/BookStore/v1/Books"), "book_store_v1_books");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("GET /a/b"), "GET__a_b");
        assert_eq!(sanitize_filename("user{id}"), "user_id_");
    }

    #[test]
    fn test_endpoint_file_stem() {
        assert_eq!(
            endpoint_file_stem("GET", "/BookStore/v1/Books"),
            "GET_BookStore_v1_Books"
        );
        assert_eq!(
            endpoint_file_stem("DELETE", "/Account/v1/User/{userId}"),
            "DELETE_Account_v1_User_userId"
        );
        assert_eq!(endpoint_file_stem("POST", "/"), "POST");
    }
}
