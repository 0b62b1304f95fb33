//! Key-path expressions (spec §4.8's failing-path reporting), e.g.
//! `foo.bar[2][-3].baz`. Grounded in
//! `examples/original_source/Fleece/Path.cc`/`Path.hh`: properties are
//! prefixed with `.`, array indexes are bracketed, negative indexes
//! count from the end, and a leading `$.` is accepted and ignored.

use crate::error::{Error, Result};
use crate::value::Value;

/// One parsed step of a path: either a dict key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Key(String),
    Index(i32),
}

/// A parsed path expression, ready to be evaluated against any root value.
#[derive(Debug, Clone)]
pub struct Path {
    specifier: String,
    components: Vec<Component>,
}

impl Path {
    /// Parses `specifier` eagerly, so syntax errors surface at
    /// construction time rather than at first `eval`.
    pub fn parse(specifier: &str) -> Result<Path> {
        let mut components = Vec::new();
        for_each_component(specifier, |token, param| {
            if token == '.' {
                components.push(Component::Key(param.to_string()));
            } else {
                let index: i32 = param
                    .parse()
                    .map_err(|_| Error::PathSyntax(format!("invalid array index '{}'", param)))?;
                components.push(Component::Index(index));
            }
            Ok(())
        })?;
        Ok(Path {
            specifier: specifier.to_string(),
            components,
        })
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Walks `root` along this path, returning `None` as soon as a step
    /// doesn't apply (wrong container kind, missing key, index out of
    /// range).
    pub fn eval<'a>(&self, root: Value<'a>) -> Option<Value<'a>> {
        let mut item = root;
        for component in &self.components {
            item = eval_component(component, item)?;
        }
        Some(item)
    }

    /// One-shot evaluation without building a reusable `Path` (mirrors
    /// `Path::eval(slice, SharedKeys*, Value*)`).
    pub fn eval_once<'a>(specifier: &str, root: Value<'a>) -> Result<Option<Value<'a>>> {
        Ok(Path::parse(specifier)?.eval(root))
    }

    /// Renders this path back to its textual form, e.g. for error
    /// messages pointing at a specific schema failure location.
    pub fn to_string_repr(&self) -> String {
        let mut out = String::new();
        for component in &self.components {
            match component {
                Component::Key(k) => {
                    out.push('.');
                    out.push_str(k);
                }
                Component::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

fn eval_component<'a>(component: &Component, item: Value<'a>) -> Option<Value<'a>> {
    match component {
        Component::Key(k) => item.as_dict()?.get(k),
        Component::Index(i) => get_from_array(item, *i),
    }
}

fn get_from_array<'a>(item: Value<'a>, index: i32) -> Option<Value<'a>> {
    let arr = item.as_array()?;
    let count = arr.count() as i64;
    let resolved = if index < 0 {
        count + index as i64
    } else {
        index as i64
    };
    if resolved < 0 || resolved >= count {
        return None;
    }
    arr.get(resolved as usize)
}

/// Splits `in` into `(token, param)` pairs, where `token` is `.` or `[`
/// and `param` is the property name or the array-index text (without the
/// surrounding bracket). Ported from `Path::forEachComponent`.
fn for_each_component(
    input: &str,
    mut callback: impl FnMut(char, &str) -> Result<()>,
) -> Result<()> {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return Err(Error::PathSyntax("empty path".into()));
    }
    let mut pos = 0usize;
    let mut token = if bytes[pos] == b'$' {
        pos += 1;
        if pos == bytes.len() {
            return Ok(()); // "$" alone means the root
        }
        let t = bytes[pos] as char;
        pos += 1;
        if t != '.' && t != '[' {
            return Err(Error::PathSyntax("invalid path delimiter after $".into()));
        }
        t
    } else if bytes[pos] == b'[' || bytes[pos] == b'.' {
        let t = bytes[pos] as char;
        pos += 1;
        t
    } else {
        '.'
    };

    if pos == bytes.len() && token == '.' {
        return Ok(()); // "." or "" means the root
    }

    loop {
        let (param, next) = if token == '.' {
            let end = input[pos..]
                .find(|c| c == '.' || c == '[')
                .map(|i| pos + i)
                .unwrap_or(bytes.len());
            (&input[pos..end], end)
        } else if token == '[' {
            let end = input[pos..]
                .find(']')
                .map(|i| pos + i)
                .ok_or_else(|| Error::PathSyntax("missing ']'".into()))?;
            (&input[pos..end], end + 1)
        } else {
            return Err(Error::PathSyntax("invalid path component".into()));
        };

        if param.is_empty() {
            return Err(Error::PathSyntax("empty property or index".into()));
        }
        callback(token, param)?;

        if next >= bytes.len() {
            break;
        }
        token = bytes[next] as char;
        pos = next + 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderOptions};
    use crate::validator::validate;

    fn sample_doc() -> Vec<u8> {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_dict(None).unwrap();
        enc.write_key_str("foo").unwrap();
        enc.begin_dict(None).unwrap();
        enc.write_key_str("bar").unwrap();
        enc.begin_array(None).unwrap();
        enc.write_int(10).unwrap();
        enc.write_int(20).unwrap();
        enc.write_int(30).unwrap();
        enc.end_array().unwrap();
        enc.end_dict().unwrap();
        enc.end_dict().unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn parses_and_evaluates_mixed_path() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let path = Path::parse("foo.bar[1]").unwrap();
        let v = path.eval(root).unwrap();
        assert_eq!(v.as_int(), 20);
    }

    #[test]
    fn negative_index_counts_from_end() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let path = Path::parse("foo.bar[-1]").unwrap();
        let v = path.eval(root).unwrap();
        assert_eq!(v.as_int(), 30);
    }

    #[test]
    fn leading_dollar_dot_is_ignored() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let path = Path::parse("$.foo.bar[0]").unwrap();
        let v = path.eval(root).unwrap();
        assert_eq!(v.as_int(), 10);
    }

    #[test]
    fn missing_key_returns_none() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let path = Path::parse("foo.nope").unwrap();
        assert!(path.eval(root).is_none());
    }

    #[test]
    fn out_of_range_index_returns_none() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let path = Path::parse("foo.bar[99]").unwrap();
        assert!(path.eval(root).is_none());
    }

    #[test]
    fn rejects_unterminated_bracket() {
        assert!(Path::parse("foo[1").is_err());
    }

    #[test]
    fn rejects_empty_path() {
        assert!(Path::parse("").is_err());
    }
}
