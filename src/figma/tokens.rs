//! Design-token extraction from a file document.

use crate::figma::types::{Color, ColorToken, DesignTokens, FigmaFile, Node, Rgba, TypographyToken};

/// Walk `file` depth-first and collect color and typography tokens.
///
/// Published `FILL` styles come first as named placeholders (the style
/// listing carries no color value), then one token per solid fill in
/// document order, then one typography token per styled text node.
pub fn extract(file: &FigmaFile) -> DesignTokens {
    let mut tokens = DesignTokens::default();

    for (key, style) in &file.styles {
        if style.style_type == "FILL" {
            tokens.colors.push(ColorToken {
                name: style.name.clone(),
                value: format!("#{key}"),
                rgba: Rgba {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: 1.0,
                },
            });
        }
    }

    collect_colors(&file.document, &mut tokens.colors);
    collect_typography(&file.document, &mut tokens.typography);
    tokens
}

fn collect_colors(node: &Node, colors: &mut Vec<ColorToken>) {
    for fill in &node.fills {
        let Some(color) = fill.color.filter(|_| fill.paint_type == "SOLID") else {
            continue;
        };
        colors.push(ColorToken {
            name: format!("{}_{}", display_name(node, "Color"), colors.len()),
            value: to_hex(color),
            rgba: Rgba {
                r: channel(color.r),
                g: channel(color.g),
                b: channel(color.b),
                a: color.a,
            },
        });
    }

    for child in &node.children {
        collect_colors(child, colors);
    }
}

fn collect_typography(node: &Node, typography: &mut Vec<TypographyToken>) {
    if node.node_type == "TEXT" {
        if let Some(style) = &node.style {
            typography.push(TypographyToken {
                name: format!("{}_{}", display_name(node, "Text"), typography.len()),
                font_family: style.font_family.clone(),
                font_size: style.font_size,
                font_weight: style.font_weight,
                line_height: style.line_height_px,
                letter_spacing: style.letter_spacing.map(|spacing| spacing.value()),
            });
        }
    }

    for child in &node.children {
        collect_typography(child, typography);
    }
}

fn display_name<'a>(node: &'a Node, fallback: &'a str) -> &'a str {
    if node.name.is_empty() {
        fallback
    } else {
        &node.name
    }
}

fn channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// `#rrggbb`, alpha dropped.
pub fn to_hex(color: Color) -> String {
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(color.r),
        channel(color.g),
        channel(color.b)
    )
}
