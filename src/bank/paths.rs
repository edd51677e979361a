//! Path-key normalization helpers.
//!
//! The bank is flat: hierarchical paths collapse into map keys by replacing
//! every separator style with the `->` token, so `Notes/Todo.txt`,
//! `Notes:Todo.txt` and `Notes\Todo.txt` all name the same record. The
//! original separator character is not preserved; denormalization always
//! yields `/`.

/// Flattens a hierarchical path into a bank key.
pub fn to_bank_key(path: &str) -> String {
    path.replace([':', '/', '\\'], "->")
}

/// Inverse substitution for returning keys to callers as URL paths.
pub fn to_url_path(key: &str) -> String {
    key.replace("->", "/")
}

/// The final path segment, whatever separator style the input uses.
pub fn file_name(path: &str) -> String {
    let key = to_bank_key(path);
    key.rsplit("->").next().unwrap_or_default().to_string()
}

/// Text after the last `.` of the final segment; empty when the segment has
/// no extension (or nothing before the dot).
pub fn file_extension(path: &str) -> String {
    let name = file_name(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => name[dot + 1..].to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_styles_normalize_to_one_key() {
        let key = "Notes->Todo.txt";
        assert_eq!(to_bank_key("Notes/Todo.txt"), key);
        assert_eq!(to_bank_key("Notes:Todo.txt"), key);
        assert_eq!(to_bank_key("Notes\\Todo.txt"), key);
        assert_eq!(to_bank_key(key), key);
    }

    #[test]
    fn url_path_is_the_inverse_substitution() {
        assert_eq!(to_url_path("A->B->C.txt"), "A/B/C.txt");
        // The original separator character is not recoverable.
        assert_eq!(to_url_path(&to_bank_key("A:B\\C.txt")), "A/B/C.txt");
    }

    #[test]
    fn file_name_takes_the_final_segment() {
        assert_eq!(file_name("A->B->C.txt"), "C.txt");
        assert_eq!(file_name("A/B/C.txt"), "C.txt");
        assert_eq!(file_name("C.txt"), "C.txt");
    }

    #[test]
    fn extension_is_after_the_last_dot() {
        assert_eq!(file_extension("Images->Icon.png"), "png");
        assert_eq!(file_extension("Archive.tar.gz"), "gz");
        assert_eq!(file_extension("Notes/Readme"), "");
        assert_eq!(file_extension(".hidden"), "");
        assert_eq!(file_extension("trailing."), "");
    }
}
