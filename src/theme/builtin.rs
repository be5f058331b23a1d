use crate::theme::model::Theme;
use serde_json::{Map, Value, json};

/// Id of the built-in light theme (active by default).
pub const DEFAULT_THEME_ID: &str = "default";
/// Id of the built-in dark theme.
pub const DARK_THEME_ID: &str = "dark";

fn group(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

fn shared_typography() -> Map<String, Value> {
    group(json!({
        "fontFamily": "Inter, Helvetica, Arial, sans-serif",
        "fontSize": { "title": 20, "label": 12, "glyph": 16 },
        "fontWeight": { "title": 600, "label": 400 }
    }))
}

fn shared_spacing() -> Map<String, Value> {
    group(json!({ "padding": 16, "ringGap": 8, "labelOffset": 6 }))
}

fn shared_animation() -> Map<String, Value> {
    group(json!({ "durationMs": 250, "easing": "ease-in-out" }))
}

pub(crate) fn default_theme() -> Theme {
    Theme {
        id: DEFAULT_THEME_ID.to_owned(),
        name: "Default".to_owned(),
        colors: group(json!({
            "primary": "#3b5bdb",
            "secondary": "#f59f00",
            "background": "#ffffff",
            "text": "#212529",
            "grid": "#dee2e6",
            "series": ["#e03131", "#2f9e44", "#1971c2", "#f08c00"]
        })),
        typography: shared_typography(),
        spacing: shared_spacing(),
        borders: group(json!({ "width": 1, "radius": 4, "color": "#ced4da" })),
        shadows: group(json!({ "card": { "blur": 4, "offsetY": 1, "color": "rgba(0, 0, 0, 0.15)" } })),
        animation: shared_animation(),
    }
}

pub(crate) fn dark_theme() -> Theme {
    Theme {
        id: DARK_THEME_ID.to_owned(),
        name: "Dark".to_owned(),
        colors: group(json!({
            "primary": "#748ffc",
            "secondary": "#ffd43b",
            "background": "#141517",
            "text": "#e9ecef",
            "grid": "#373a40",
            "series": ["#ff8787", "#69db7c", "#74c0fc", "#ffc078"]
        })),
        typography: shared_typography(),
        spacing: shared_spacing(),
        borders: group(json!({ "width": 1, "radius": 4, "color": "hsl(220, 8%, 30%)" })),
        shadows: group(json!({ "card": { "blur": 6, "offsetY": 2, "color": "rgba(0, 0, 0, 0.6)" } })),
        animation: shared_animation(),
    }
}
