//! `{name}` templates used by transform special cases.

use std::collections::HashMap;

use crate::error::Error;

/// Fills `{name}` placeholders from `vars`. `{{` and `}}` produce literal braces.
///
/// An undefined or unterminated placeholder is a [`Error::TemplateFill`] for `id`.
///
/// ```rust
/// use std::collections::HashMap;
/// use dexlate::template::fill;
/// let vars = HashMap::from([("group1".to_string(), "5".to_string())]);
/// assert_eq!(fill("20", "Liv.{group1}", &vars).unwrap(), "Liv.5");
/// assert!(fill("20", "{group2}", &vars).is_err());
/// ```
pub fn fill(id: &str, template: &str, vars: &HashMap<String, String>) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(Error::template_fill(id, format!("{{{name}")));
                }
                match vars.get(name.trim()) {
                    Some(value) => out.push_str(value),
                    None => return Err(Error::template_fill(id, name)),
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
