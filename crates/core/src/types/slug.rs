//! URL slugs for Vietnamese category names.

/// Fallback when a name contains no sluggable characters.
const EMPTY_SLUG: &str = "danh-muc";

/// Strip Vietnamese diacritics from a lowercase character.
const fn fold_vietnamese(ch: char) -> char {
    match ch {
        'à' | 'á' | 'ạ' | 'ả' | 'ã' | 'â' | 'ầ' | 'ấ' | 'ậ' | 'ẩ' | 'ẫ' | 'ă' | 'ằ' | 'ắ' | 'ặ'
        | 'ẳ' | 'ẵ' => 'a',
        'è' | 'é' | 'ẹ' | 'ẻ' | 'ẽ' | 'ê' | 'ề' | 'ế' | 'ệ' | 'ể' | 'ễ' => 'e',
        'ì' | 'í' | 'ị' | 'ỉ' | 'ĩ' => 'i',
        'ò' | 'ó' | 'ọ' | 'ỏ' | 'õ' | 'ô' | 'ồ' | 'ố' | 'ộ' | 'ổ' | 'ỗ' | 'ơ' | 'ờ' | 'ớ' | 'ợ'
        | 'ở' | 'ỡ' => 'o',
        'ù' | 'ú' | 'ụ' | 'ủ' | 'ũ' | 'ư' | 'ừ' | 'ứ' | 'ự' | 'ử' | 'ữ' => 'u',
        'ỳ' | 'ý' | 'ỵ' | 'ỷ' | 'ỹ' => 'y',
        'đ' => 'd',
        other => other,
    }
}

/// Convert a display name into a URL-friendly slug.
///
/// Lowercases, folds Vietnamese diacritics to ASCII, drops anything that is
/// not `a-z`, `0-9`, whitespace or `-`, turns runs of whitespace/`_`/`-` into
/// a single `-` and trims leading and trailing dashes.
///
/// ```
/// use tram_sach_core::slugify;
///
/// assert_eq!(slugify("Văn Học Việt Nam"), "van-hoc-viet-nam");
/// assert_eq!(slugify("Đời sống & Xã hội"), "doi-song-xa-hoi");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.trim().to_lowercase().chars().map(fold_vietnamese) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        EMPTY_SLUG.to_owned()
    } else {
        slug
    }
}

/// Whether `slug` is already in canonical slug form.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        assert_eq!(slugify("Science Fiction"), "science-fiction");
        assert_eq!(slugify("  self_help  "), "self-help");
        assert_eq!(slugify("a -- b"), "a-b");
    }

    #[test]
    fn test_vietnamese() {
        assert_eq!(slugify("Tiểu thuyết"), "tieu-thuyet");
        assert_eq!(slugify("Kinh Tế"), "kinh-te");
        assert_eq!(slugify("Thiếu Nhi"), "thieu-nhi");
        assert_eq!(slugify("ĐỊA LÝ"), "dia-ly");
    }

    #[test]
    fn test_symbols_are_dropped_without_splitting_words() {
        // Symbols vanish, only whitespace separates words.
        assert_eq!(slugify("C++ & Rust"), "c-rust");
        assert_eq!(slugify("Sci.Fi"), "scifi");
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(slugify(""), "danh-muc");
        assert_eq!(slugify("!!!"), "danh-muc");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("van-hoc"));
        assert!(is_valid_slug("sach-2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-van"));
        assert!(!is_valid_slug("van--hoc"));
        assert!(!is_valid_slug("Van-Hoc"));
    }
}
