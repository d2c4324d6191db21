use lazy_static::lazy_static;
use regex::{Captures, Regex};

// Interpolation follows the POSIX shell parameter expansion forms:
// https://pubs.opengroup.org/onlinepubs/000095399/basedefs/xbd_chap08.html

lazy_static! {
  pub static ref ENVIRONMENT_VARIABLE_INTERPOLATION_REGEX: Regex = Regex::new(
    r"(?x)
    \$\$|
    \$([[:word:].]+)|
    \$\{([[:word:].]+)(?:(:?-|:?\?)([^}]*))?\}",
  )
  .unwrap();
}

pub type Warnings = Vec<String>;
pub type Errors = Vec<String>;

/// Replaces `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}`, `${VAR:?error}` and
/// `${VAR?error}` with values from `get_env_value`. `$$` is an escaped `$`.
pub fn interpolate(
  input: &str,
  get_env_value: impl Fn(&str) -> Option<String>,
) -> Result<(String, Warnings), Errors> {
  let mut errors = Vec::new();
  let mut warnings = Vec::new();

  let interpolated = ENVIRONMENT_VARIABLE_INTERPOLATION_REGEX
    .replace_all(input, |caps: &Captures| {
      let flags = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
      let def_or_err = caps
        .get(4)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .to_string();

      let name = match caps.get(1).or_else(|| caps.get(2)) {
        Some(name) => name.as_str(),
        None => return "$".to_string(),
      };
      let value = get_env_value(name);

      match flags {
        ":-" => match value {
          Some(v) if !v.is_empty() => v,
          _ => def_or_err,
        },
        "-" => value.unwrap_or(def_or_err),
        ":?" => match value {
          Some(v) if !v.is_empty() => v,
          _ => {
            errors.push(format!(
              "non-empty env var required in config. name = {:?}, error = {:?}",
              name, def_or_err
            ));
            String::new()
          }
        },
        "?" => value.unwrap_or_else(|| {
          errors.push(format!(
            "missing env var required in config. name = {:?}, error = {:?}",
            name, def_or_err
          ));
          String::new()
        }),
        _ => value.unwrap_or_else(|| {
          warnings.push(format!("unknown env var in config. name = {:?}", name));
          String::new()
        }),
      }
    })
    .into_owned();

  if errors.is_empty() {
    Ok((interpolated, warnings))
  } else {
    Err(errors)
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn env(key: &str) -> Option<String> {
    HashMap::from([("CACHE_SIZE", "50"), ("EMPTY", "")])
      .get(key)
      .map(|value| value.to_string())
  }

  #[test]
  fn substitutes_variables() {
    let (output, warnings) = interpolate("$CACHE_SIZE ${CACHE_SIZE} $$ ${MISSING:-7}", env).unwrap();

    assert_eq!(output, "50 50 $ 7");
    assert!(warnings.is_empty());
  }

  #[test]
  fn reports_missing_variables() {
    let (output, warnings) = interpolate("[${MISSING}] [${EMPTY-x}] [${EMPTY:-x}]", env).unwrap();
    assert_eq!(output, "[] [] [x]");
    assert_eq!(warnings.len(), 1);

    let errors = interpolate("${MISSING:?required} ${EMPTY:?required}", env).unwrap_err();
    assert_eq!(errors.len(), 2);
  }

  #[test]
  fn pattern_compiles() {
    lazy_static::initialize(&ENVIRONMENT_VARIABLE_INTERPOLATION_REGEX);
    assert!(ENVIRONMENT_VARIABLE_INTERPOLATION_REGEX.is_match("${A:-b}"));
  }
}
