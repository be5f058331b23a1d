use super::*;

fn classify(p: &str) -> Impact {
    ImpactClassifier::default().classify(&DataPath::parse(p).unwrap())
}

#[test]
fn geometry_and_theme_background_are_high() {
    assert_eq!(classify("width"), Impact::High);
    assert_eq!(classify("viewBox"), Impact::High);
    assert_eq!(classify("layout.columns[2]"), Impact::High);
    assert_eq!(classify("theme.colors.background"), Impact::High);
    assert_eq!(classify("theme.borders.width"), Impact::High);
}

#[test]
fn collections_and_theme_are_medium() {
    assert_eq!(classify("sections[0].items[3].label"), Impact::Medium);
    assert_eq!(classify("items[1]"), Impact::Medium);
    assert_eq!(classify("theme.colors.primary"), Impact::Medium);
}

#[test]
fn prefixes_match_whole_segments() {
    assert_eq!(classify("widthUnit"), Impact::Low);
    assert_eq!(classify("title"), Impact::Low);
    assert_eq!(classify("meta.width"), Impact::Low);
}

#[test]
fn custom_tables() {
    let c = ImpactClassifier::new(vec![DataPath::parse("axis").unwrap()], vec![]);
    assert_eq!(c.classify(&DataPath::parse("axis.x").unwrap()), Impact::High);
    assert_eq!(c.classify(&DataPath::parse("width").unwrap()), Impact::Low);
}

#[test]
fn priorities() {
    assert_eq!(
        [Impact::High, Impact::Medium, Impact::Low].map(Impact::priority),
        [1, 2, 3]
    );
}
