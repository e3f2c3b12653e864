//! String normalization applied before uniqueness checks and storage.
//!
//! All three functions are pure and idempotent.

/// Identity and staff numbers: drop dots, hyphens, and all whitespace.
pub fn identifier(value: &str) -> String {
  value
    .chars()
    .filter(|c| !matches!(c, '.' | '-') && !c.is_whitespace())
    .collect()
}

/// Degree program codes: no whitespace anywhere, upper-cased.
pub fn code(value: &str) -> String {
  value
    .chars()
    .filter(|c| !c.is_whitespace())
    .flat_map(char::to_uppercase)
    .collect()
}

/// Free-text names: trimmed, runs of whitespace collapsed to one space.
pub fn name(value: &str) -> String {
  value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifier_strips_separators() {
    assert_eq!(identifier(" 12.345.678 "), "12345678");
    assert_eq!(identifier("20-12345678-9"), "20123456789");
    assert_eq!(identifier("12 345\t678"), "12345678");
  }

  #[test]
  fn code_upper_cases_and_removes_spaces() {
    assert_eq!(code("  ing sis "), "INGSIS");
    assert_eq!(code("lic.mat-2"), "LIC.MAT-2");
  }

  #[test]
  fn name_collapses_whitespace() {
    assert_eq!(name("  Algebra   Lineal "), "Algebra Lineal");
    assert_eq!(name("Algebra\t\nLineal"), "Algebra Lineal");
    assert_eq!(name("   "), "");
  }

  #[test]
  fn normalizers_are_idempotent() {
    let samples = [
      "",
      "   ",
      "  Algebra  Lineal ",
      "a\u{00a0}b",
      "x.y-z  w",
      "ß straße",
      "\tMixed\nCase  Code ",
    ];
    for s in samples {
      assert_eq!(name(&name(s)), name(s), "name({s:?})");
      assert_eq!(code(&code(s)), code(s), "code({s:?})");
      assert_eq!(identifier(&identifier(s)), identifier(s), "identifier({s:?})");
    }
  }
}
