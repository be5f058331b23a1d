use super::*;

#[test]
fn parses_hex_triplet_and_sextet() {
    assert_eq!(parse_color("#ff0000").unwrap(), ColorDef::rgba(1.0, 0.0, 0.0, 1.0));
    assert_eq!(parse_color("#0F0").unwrap(), ColorDef::rgba(0.0, 1.0, 0.0, 1.0));
    assert_eq!(parse_color("#1a2b3c").unwrap().to_hex(), "#1a2b3c");
}

#[test]
fn rejects_other_hex_lengths_and_digits() {
    assert!(parse_color("#ff00").is_err());
    assert!(parse_color("#ff000080").is_err());
    assert!(parse_color("#gg0000").is_err());
}

#[test]
fn parses_functional_forms() {
    let c = parse_color("rgb(255, 128, 0)").unwrap();
    assert!((c.g - 128.0 / 255.0).abs() < 1e-9);

    let c = parse_color("rgba(0,0,0,0.5)").unwrap();
    assert!((c.a - 0.5).abs() < 1e-9);

    let c = parse_color("RGB(100%, 0%, 0%)").unwrap();
    assert_eq!(c.to_hex(), "#ff0000");

    // Pure red.
    let c = parse_color("hsl(0, 100%, 50%)").unwrap();
    assert!((c.r - 1.0).abs() < 1e-9);
    assert!(c.g.abs() < 1e-9);

    let c = parse_color("hsla(120deg, 100%, 25%, 0.3)").unwrap();
    assert_eq!(c.to_hex(), "#008000");
    assert!((c.a - 0.3).abs() < 1e-9);
}

#[test]
fn rejects_malformed_functional_forms() {
    assert!(parse_color("rgb(1,2)").is_err());
    assert!(parse_color("rgba(1,2,3)").is_err());
    assert!(parse_color("rgb(300,0,0)").is_err());
    assert!(parse_color("rgba(0,0,0,2)").is_err());
    assert!(parse_color("hsl(0, 50, 50%)").is_err());
    assert!(parse_color("rgb(0,0,0").is_err());
    assert!(parse_color("cmyk(0,0,0,0)").is_err());
    assert!(parse_color("blue").is_err());
}
