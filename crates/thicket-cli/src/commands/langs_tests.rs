use super::langs::list;

#[test]
fn lists_bundled_languages() {
    let out = list();
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "Supported languages (3):");
    assert!(lines[1].starts_with("  json (abi "), "{out}");
    assert!(lines[2].starts_with("  script (abi "), "{out}");
    assert!(lines[3].starts_with("  template (abi "), "{out}");
}
