//! `#`-run padding conversion.
//!
//! A run of N `#` characters stands for a zero-padded numeric field of width
//! N: `sh###` with the field `shot` becomes `sh{shot:0>3}`.

/// Replace the `#` run in `text` with a zero-padded format field for `name`.
///
/// The width is the total number of `#` characters. When they are not one
/// contiguous run the text is returned unchanged.
pub fn replace_hash_with_field(name: &str, text: &str) -> String {
    let count = text.matches('#').count();
    if count == 0 {
        return text.to_string();
    }
    let run = "#".repeat(count);
    let field = format!("{{{}:0>{}}}", name, count);
    text.replace(&run, &field)
}
