use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"\S+@\S+").unwrap();
    static ref URL: Regex = Regex::new(r"http\S+|www\S+").unwrap();
    static ref TAG: Regex = Regex::new(r"<.*?>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Cleans raw email text before it is handed to the tokenizer.
///
/// Lower-cases the text, drops email addresses, URLs and HTML-like tags, then collapses
/// whitespace and trims. A removal can expose a new match (`ww<b>w.example.org`, or a tag
/// broken across a newline), so the pass repeats until the text stops changing. After the
/// first pass every repeat can only shorten the text, which bounds the loop.
///
/// # Example
/// ```
/// use triage::normalize;
///
/// let cleaned = normalize("Hi <b>Registry</b>, mail me at jo@uni.edu or see https://uni.edu/apply");
/// assert_eq!(cleaned, "hi registry, mail me at or see");
/// ```
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut current = clean_pass(&raw.to_lowercase());
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Same as [`normalize`] for callers holding an optional field.
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

fn clean_pass(text: &str) -> String {
    let text = EMAIL.replace_all(text, "");
    let text = URL.replace_all(&text, "");
    let text = TAG.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}
