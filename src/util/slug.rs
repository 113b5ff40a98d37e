const POST_EXTENSIONS: [&str; 2] = [".mdx", ".md"];

fn slugify(text: &str) -> String {
    let ascii = unidecode::unidecode(text).to_ascii_lowercase();

    let mut slug = String::new();
    let mut prev_char = None;

    for c in ascii.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '-' };
        if c != '-' || prev_char != Some('-') {
            slug.push(c);
        }
        prev_char = Some(c);
    }

    slug.trim_matches('-').to_string()
}

/// File name stem for a new post, e.g. `Rust & Me` -> `rust-me`.
pub fn title_to_filename(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Suggested URL segment for a category the category map does not know yet.
pub fn suggest_category_slug(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        "category".to_string()
    } else {
        slug
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub fn slug_from_id(id: &str) -> String {
    for ext in POST_EXTENSIONS {
        if let Some(stem) = id.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    id.to_string()
}
